use rust_decimal::Decimal;
use tracing::debug;

use crate::series::{HedgePoint, HedgeSeries, PriceBar, PricePair};
use crate::{PairsError, PairsResult};

/// Rolling hedge ratio of leg A on leg B.
///
/// For every bar with a full window, the ratio is the slope of an OLS fit of
/// `close_a` on `close_b` through the origin over the `lookback` most recent
/// bars ending at that bar: `sum(a * b) / sum(b^2)`. The first `lookback - 1`
/// points carry no ratio and must be trimmed before standardising the spread.
///
/// A window in which `close_b` never changes makes the fit degenerate and
/// fails the whole estimate.
pub fn estimate_hedge(prices: &PricePair, lookback: usize) -> PairsResult<HedgeSeries> {
    prices.validate()?;
    if lookback == 0 {
        return Err(PairsError::InvalidInput {
            field: "lookback".into(),
            reason: "Lookback must be at least 1 bar".into(),
        });
    }
    let n = prices.len();
    if lookback > n {
        return Err(PairsError::InsufficientData(format!(
            "Lookback of {} bars exceeds the {} bars available",
            lookback, n
        )));
    }

    let bars = &prices.bars;
    let mut points: Vec<HedgePoint> = bars[..lookback - 1]
        .iter()
        .map(|bar| HedgePoint {
            timestamp: bar.timestamp,
            hedge_ratio: None,
        })
        .collect();
    points.reserve(n - points.len());

    // Length of the run of equal close_b values ending at each bar
    let mut equal_run = 0usize;
    for (i, bar) in bars.iter().enumerate() {
        equal_run = if i > 0 && bar.close_b == bars[i - 1].close_b {
            equal_run + 1
        } else {
            1
        };
        if i + 1 < lookback {
            continue;
        }
        if equal_run >= lookback {
            return Err(PairsError::DegenerateRegression {
                timestamp: bar.timestamp,
                lookback,
            });
        }
        let window = &bars[i + 1 - lookback..=i];
        points.push(HedgePoint {
            timestamp: bar.timestamp,
            hedge_ratio: Some(through_origin_slope(window, lookback)?),
        });
    }

    debug!(
        bars = n,
        lookback,
        warmup = lookback - 1,
        "estimated rolling hedge ratio"
    );

    Ok(HedgeSeries { lookback, points })
}

/// OLS slope without intercept over one window.
fn through_origin_slope(window: &[PriceBar], lookback: usize) -> PairsResult<Decimal> {
    let overflow = || PairsError::NumericOverflow {
        context: format!(
            "hedge regression sums over window ending {:?}",
            window.last().map(|b| b.timestamp)
        ),
    };
    let mut sum_ab = Decimal::ZERO;
    let mut sum_bb = Decimal::ZERO;
    for bar in window {
        sum_ab = bar
            .close_a
            .checked_mul(bar.close_b)
            .and_then(|ab| sum_ab.checked_add(ab))
            .ok_or_else(overflow)?;
        sum_bb = bar
            .close_b
            .checked_mul(bar.close_b)
            .and_then(|bb| sum_bb.checked_add(bb))
            .ok_or_else(overflow)?;
    }
    if sum_bb.is_zero() {
        let last = window.last().map(|b| b.timestamp);
        return match last {
            Some(timestamp) => Err(PairsError::DegenerateRegression {
                timestamp,
                lookback,
            }),
            None => Err(PairsError::InsufficientData("Empty regression window".into())),
        };
    }
    Ok(sum_ab / sum_bb)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
