use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::{ln_decimal, mean, sample_variance, sqrt_decimal};
use crate::series::{ensure_aligned, HedgeSeries, PricePair, SpreadPoint, SpreadSeries};
use crate::{PairsError, PairsResult};

/// The excursion band is a magnitude.
pub fn validate_band(band: Decimal) -> PairsResult<()> {
    if band < Decimal::ZERO {
        return Err(PairsError::InvalidInput {
            field: "band".into(),
            reason: "Diagnostic band must be non-negative".into(),
        });
    }
    Ok(())
}

/// 5% critical value of the Dickey-Fuller distribution with a constant.
pub const ADF_CRITICAL_5PCT: Decimal = dec!(-2.86);

/// Fewest spread observations the diagnostics regression can use.
pub const MIN_DIAGNOSTIC_OBSERVATIONS: usize = 3;

/// Combine prices and hedge ratios into a spread and standardise it.
///
/// `spread = close_a - hedge_ratio * close_b`, then
/// `zscore = (spread - mean) / std_dev` where mean and (sample) standard
/// deviation are taken over the *entire* series. The z-score is therefore not
/// causal: every bar is scored against a distribution that includes later
/// bars. Both inputs must already be trimmed to bars with a defined ratio.
pub fn standardize_spread(prices: &PricePair, hedge: &HedgeSeries) -> PairsResult<SpreadSeries> {
    ensure_aligned("standardize_spread", &prices.bars, &hedge.points)?;

    let mut points = Vec::with_capacity(prices.len());
    for (bar, h) in prices.bars.iter().zip(&hedge.points) {
        let hedge_ratio = h.hedge_ratio.ok_or_else(|| PairsError::MisalignedSeries {
            context: "standardize_spread".into(),
            reason: format!(
                "hedge ratio undefined at {}; trim warm-up bars first",
                bar.timestamp
            ),
        })?;
        points.push(SpreadPoint {
            timestamp: bar.timestamp,
            hedge_ratio,
            spread: bar.close_a - hedge_ratio * bar.close_b,
            zscore: Decimal::ZERO,
        });
    }

    if points.len() < 2 {
        return Err(PairsError::InsufficientData(format!(
            "At least 2 spread observations required to standardise, got {}",
            points.len()
        )));
    }

    let spreads: Vec<Decimal> = points.iter().map(|p| p.spread).collect();
    let spread_mean = mean(&spreads)?;
    let std_dev = sqrt_decimal(sample_variance(&spreads, spread_mean)?);
    if std_dev.is_zero() {
        return Err(PairsError::InsufficientData(
            "Spread has zero variance; z-score undefined".into(),
        ));
    }

    for p in &mut points {
        p.zscore = (p.spread - spread_mean) / std_dev;
    }

    debug!(
        bars = points.len(),
        mean = %spread_mean,
        std_dev = %std_dev,
        "standardised spread over full sample"
    );

    Ok(SpreadSeries {
        mean: spread_mean,
        std_dev,
        points,
    })
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Descriptive statistics of a spread series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadDiagnostics {
    pub observations: usize,
    pub mean: Decimal,
    pub std_dev: Decimal,
    /// t-statistic of beta in dS_t = alpha + beta * S_{t-1}; more negative = more stationary
    pub adf_statistic: Decimal,
    /// Whether `adf_statistic` is below the 5% critical value
    pub likely_stationary: bool,
    /// Mean-reversion half-life in bars (zero when the AR(1) fit is not mean-reverting)
    pub half_life: Decimal,
    /// Band used for the excursion counts
    pub band: Decimal,
    /// Bars with spread > band
    pub bars_above_band: usize,
    /// Bars with spread < -band
    pub bars_below_band: usize,
}

/// Stationarity and excursion statistics of the raw spread.
///
/// Reported only. Nothing downstream accepts or rejects the pair on these numbers.
pub fn spread_diagnostics(spread: &SpreadSeries, band: Decimal) -> PairsResult<SpreadDiagnostics> {
    validate_band(band)?;
    let values = spread.spreads();
    if values.len() < MIN_DIAGNOSTIC_OBSERVATIONS {
        return Err(PairsError::InsufficientData(format!(
            "Need at least {} observations for spread diagnostics",
            MIN_DIAGNOSTIC_OBSERVATIONS
        )));
    }

    let adf_statistic = adf_test_statistic(&values);
    Ok(SpreadDiagnostics {
        observations: values.len(),
        mean: spread.mean,
        std_dev: spread.std_dev,
        adf_statistic,
        likely_stationary: adf_statistic < ADF_CRITICAL_5PCT,
        half_life: half_life(&values),
        band,
        bars_above_band: values.iter().filter(|s| **s > band).count(),
        bars_below_band: values.iter().filter(|s| **s < -band).count(),
    })
}

/// ADF-like t-statistic of the lagged level in a regression of spread
/// differences: dS_t = alpha + beta * S_{t-1} + e_t. Requires n >= 3.
fn adf_test_statistic(spread: &[Decimal]) -> Decimal {
    let n = spread.len();
    let m = n - 1;
    let m_dec = Decimal::from(m as i64);

    let mut sum_lag = Decimal::ZERO;
    let mut sum_ds = Decimal::ZERO;
    let mut sum_lag2 = Decimal::ZERO;
    let mut sum_lag_ds = Decimal::ZERO;
    for w in spread.windows(2) {
        let (lag, ds) = (w[0], w[1] - w[0]);
        sum_lag += lag;
        sum_ds += ds;
        sum_lag2 += lag * lag;
        sum_lag_ds += lag * ds;
    }

    let mean_lag = sum_lag / m_dec;
    let mean_ds = sum_ds / m_dec;
    let cov = sum_lag_ds / m_dec - mean_lag * mean_ds;
    let var_lag = sum_lag2 / m_dec - mean_lag * mean_lag;
    if var_lag <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let beta = cov / var_lag;
    let alpha = mean_ds - beta * mean_lag;

    let sse: Decimal = spread
        .windows(2)
        .map(|w| {
            let e = (w[1] - w[0]) - alpha - beta * w[0];
            e * e
        })
        .sum();
    let dof = Decimal::from(m.saturating_sub(2).max(1) as i64);
    let se_beta = sqrt_decimal(sse / dof / (var_lag * m_dec));
    if se_beta.is_zero() {
        return Decimal::ZERO;
    }
    beta / se_beta
}

/// AR(1) half-life: S_t = c + phi * S_{t-1}, half_life = -ln 2 / ln phi.
fn half_life(spread: &[Decimal]) -> Decimal {
    let m_dec = Decimal::from((spread.len() - 1) as i64);

    let mut sum_x = Decimal::ZERO;
    let mut sum_y = Decimal::ZERO;
    let mut sum_xy = Decimal::ZERO;
    let mut sum_x2 = Decimal::ZERO;
    for w in spread.windows(2) {
        sum_x += w[0];
        sum_y += w[1];
        sum_xy += w[0] * w[1];
        sum_x2 += w[0] * w[0];
    }

    let denom = m_dec * sum_x2 - sum_x * sum_x;
    if denom.is_zero() {
        return Decimal::ZERO;
    }
    let phi = (m_dec * sum_xy - sum_x * sum_y) / denom;
    if phi <= Decimal::ZERO || phi >= Decimal::ONE {
        return Decimal::ZERO;
    }

    match (ln_decimal(dec!(2)), ln_decimal(phi)) {
        (Some(ln2), Some(ln_phi)) if !ln_phi.is_zero() => (-ln2 / ln_phi).abs(),
        _ => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
