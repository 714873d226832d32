use rust_decimal::Decimal;
use tracing::debug;

use crate::series::{ensure_aligned, PortfolioPoint, PortfolioSeries, PositionSeries, PricePair};
use crate::types::{Price, Rate};
use crate::{PairsError, PairsResult};

/// Turn positions into leg exposures, period returns and an equity curve.
///
/// Exposures are `-p * close_a` and `p * close_b` for position sign `p`. The
/// period return is the percentage change of the total exposure, except that
/// it is zero on the first bar, after a flat bar (zero total), and whenever
/// the change would wipe out or invert the equity (ratio <= -1, which covers
/// closing a position and flipping straight from long to short). A held
/// position whose total crosses zero also books a zero return, so that loss
/// never reaches the equity curve. Equity starts at 1.0 and compounds the
/// returns, so it stays strictly positive.
pub fn compute_portfolio(
    prices: &PricePair,
    positions: &PositionSeries,
) -> PairsResult<PortfolioSeries> {
    ensure_aligned("compute_portfolio", &prices.bars, positions.points())?;

    let mut points = Vec::with_capacity(prices.len());
    let mut prev_total: Option<Price> = None;
    let mut equity = Decimal::ONE;

    for (bar, pos) in prices.bars.iter().zip(positions.points()) {
        let sign = pos.position.as_decimal();
        let exposure_a = -sign * bar.close_a;
        let exposure_b = sign * bar.close_b;
        let total = exposure_a + exposure_b;

        let period_return = prev_total.map_or(Decimal::ZERO, |prev| period_return(prev, total));
        equity = equity
            .checked_mul(Decimal::ONE + period_return)
            .ok_or_else(|| PairsError::NumericOverflow {
                context: format!("equity compounding at {}", bar.timestamp),
            })?;

        points.push(PortfolioPoint {
            timestamp: bar.timestamp,
            position: pos.position,
            exposure_a,
            exposure_b,
            total,
            period_return,
            equity,
        });
        prev_total = Some(total);
    }

    debug!(
        bars = points.len(),
        final_equity = %equity,
        "computed portfolio equity curve"
    );

    Ok(PortfolioSeries { points })
}

/// Sanitised percentage change between consecutive totals.
fn period_return(prev: Price, current: Price) -> Rate {
    if prev.is_zero() {
        return Decimal::ZERO;
    }
    match (current - prev).checked_div(prev) {
        Some(r) if r > -Decimal::ONE => r,
        _ => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Position, PositionPoint, PriceBar};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + Duration::minutes(i as i64)
    }

    fn prices(rows: &[(Decimal, Decimal)]) -> PricePair {
        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, (a, b))| PriceBar {
                timestamp: ts(i),
                close_a: *a,
                close_b: *b,
            })
            .collect();
        PricePair::new("A", "B", bars).unwrap()
    }

    fn positions(states: &[Position]) -> PositionSeries {
        PositionSeries {
            points: states
                .iter()
                .enumerate()
                .map(|(i, p)| PositionPoint {
                    timestamp: ts(i),
                    position: *p,
                })
                .collect(),
        }
    }

    #[test]
    fn test_exposures_follow_position_sign() {
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(120))]);
        let pos = positions(&[Position::Long, Position::Short]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();

        let long = &portfolio.points()[0];
        assert_eq!(long.exposure_a, dec!(-100));
        assert_eq!(long.exposure_b, dec!(120));
        assert_eq!(long.total, dec!(20));

        let short = &portfolio.points()[1];
        assert_eq!(short.exposure_a, dec!(100));
        assert_eq!(short.exposure_b, dec!(-120));
        assert_eq!(short.total, dec!(-20));
    }

    #[test]
    fn test_all_flat_equity_constant() {
        let p = prices(&[
            (dec!(100), dec!(50)),
            (dec!(101), dec!(52)),
            (dec!(99), dec!(49)),
        ]);
        let pos = positions(&[Position::Flat; 3]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        for point in portfolio.points() {
            assert_eq!(point.total, Decimal::ZERO);
            assert_eq!(point.period_return, Decimal::ZERO);
            assert_eq!(point.equity, Decimal::ONE);
        }
    }

    #[test]
    fn test_held_position_compounds() {
        // Long totals: 20 -> 25 -> 30 => returns 0.25 then 0.2 => equity 1.5
        let p = prices(&[
            (dec!(100), dec!(120)),
            (dec!(100), dec!(125)),
            (dec!(100), dec!(130)),
        ]);
        let pos = positions(&[Position::Long; 3]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        let pts = portfolio.points();
        assert_eq!(pts[0].period_return, Decimal::ZERO);
        assert_eq!(pts[1].period_return, dec!(0.25));
        assert_eq!(pts[2].period_return, dec!(0.2));
        assert_eq!(portfolio.final_equity(), dec!(1.5));
    }

    #[test]
    fn test_flat_to_long_return_is_zero() {
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(125))]);
        let pos = positions(&[Position::Flat, Position::Long]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        assert_eq!(portfolio.points()[1].period_return, Decimal::ZERO);
        assert_eq!(portfolio.final_equity(), Decimal::ONE);
    }

    #[test]
    fn test_long_to_flat_is_not_a_total_loss() {
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(125))]);
        let pos = positions(&[Position::Long, Position::Flat]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        assert_eq!(portfolio.points()[1].period_return, Decimal::ZERO);
        assert_eq!(portfolio.final_equity(), Decimal::ONE);
    }

    #[test]
    fn test_flip_long_to_short_keeps_equity_positive() {
        // total 20 -> -20 is a ratio of -2
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(120))]);
        let pos = positions(&[Position::Long, Position::Short]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        assert_eq!(portfolio.points()[1].period_return, Decimal::ZERO);
        assert!(portfolio.final_equity() > Decimal::ZERO);
    }

    #[test]
    fn test_total_crossing_zero_within_position() {
        // Long totals 20 -> -5: ratio -1.25 is sanitised
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(95))]);
        let pos = positions(&[Position::Long, Position::Long]);
        let portfolio = compute_portfolio(&p, &pos).unwrap();
        assert_eq!(portfolio.points()[1].period_return, Decimal::ZERO);
        assert_eq!(portfolio.points()[1].position, Position::Long);
        assert_eq!(portfolio.final_equity(), Decimal::ONE);
    }

    #[test]
    fn test_misaligned_positions_rejected() {
        let p = prices(&[(dec!(100), dec!(120)), (dec!(100), dec!(125))]);
        let pos = positions(&[Position::Flat]);
        let result = compute_portfolio(&p, &pos);
        assert!(matches!(result, Err(PairsError::MisalignedSeries { .. })));
    }

    #[test]
    fn test_period_return_helper() {
        assert_eq!(period_return(Decimal::ZERO, dec!(5)), Decimal::ZERO);
        assert_eq!(period_return(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(period_return(dec!(10), dec!(5)), dec!(-0.5));
        assert_eq!(period_return(dec!(-10), dec!(-12)), dec!(0.2));
    }
}
