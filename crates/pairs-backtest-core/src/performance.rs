use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::math::{mean, sample_variance, sqrt_decimal};
use crate::series::{PortfolioSeries, Position};
use crate::types::Rate;
use crate::{PairsError, PairsResult};

/// Risk/reward statistics of an equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub bars: usize,
    pub final_equity: Decimal,
    /// final_equity - 1
    pub total_return: Rate,
    pub mean_period_return: Rate,
    /// Mean period return scaled by periods per year
    pub annualised_return: Rate,
    /// Sample std-dev of period returns scaled by sqrt(periods per year)
    pub annualised_volatility: Rate,
    /// Annualised return over annualised volatility (zero risk-free rate)
    pub sharpe_ratio: Decimal,
    /// Largest peak-to-trough decline of equity, as a fraction of the peak
    pub max_drawdown: Rate,
    /// Entries from flat plus direct long/short flips
    pub round_trips: usize,
    pub bars_long: usize,
    pub bars_short: usize,
    pub bars_flat: usize,
}

/// Summarise a portfolio series.
pub fn summarize(
    portfolio: &PortfolioSeries,
    periods_per_year: Decimal,
) -> PairsResult<PerformanceSummary> {
    if periods_per_year <= Decimal::ZERO {
        return Err(PairsError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Periods per year must be positive".into(),
        });
    }
    if portfolio.is_empty() {
        return Err(PairsError::InsufficientData(
            "Cannot summarise an empty portfolio".into(),
        ));
    }

    let returns = portfolio.returns();
    let mean_return = mean(&returns)?;
    let annualised_return = mean_return * periods_per_year;
    let annualised_volatility =
        sqrt_decimal(sample_variance(&returns, mean_return)?) * sqrt_decimal(periods_per_year);
    let sharpe_ratio = if annualised_volatility.is_zero() {
        Decimal::ZERO
    } else {
        annualised_return / annualised_volatility
    };

    let final_equity = portfolio.final_equity();
    let count = |target: Position| {
        portfolio
            .points()
            .iter()
            .filter(|p| p.position == target)
            .count()
    };

    Ok(PerformanceSummary {
        bars: portfolio.len(),
        final_equity,
        total_return: final_equity - Decimal::ONE,
        mean_period_return: mean_return,
        annualised_return,
        annualised_volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(portfolio),
        round_trips: round_trips(portfolio),
        bars_long: count(Position::Long),
        bars_short: count(Position::Short),
        bars_flat: count(Position::Flat),
    })
}

fn max_drawdown(portfolio: &PortfolioSeries) -> Rate {
    let mut peak = Decimal::ONE;
    let mut max_dd = Decimal::ZERO;
    for p in portfolio.points() {
        if p.equity > peak {
            peak = p.equity;
        }
        let dd = (peak - p.equity) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

fn round_trips(portfolio: &PortfolioSeries) -> usize {
    let mut previous = Position::Flat;
    let mut trips = 0;
    for p in portfolio.points() {
        if !p.position.is_flat() && p.position != previous {
            trips += 1;
        }
        previous = p.position;
    }
    trips
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
