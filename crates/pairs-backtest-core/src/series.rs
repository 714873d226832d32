//! Time-indexed series passed between the backtest stages.
//!
//! Every series is produced once by its stage and only ever borrowed
//! afterwards. Two series are aligned when they have the same length and the
//! same timestamp at every index; stages refuse misaligned input with
//! [`PairsError::MisalignedSeries`].

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, Rate, ZScore};
use crate::{PairsError, PairsResult};

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// A row keyed by its bar timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
}

/// Check that two row slices share length and timestamps index by index.
pub fn ensure_aligned<L: Timestamped, R: Timestamped>(
    context: &str,
    left: &[L],
    right: &[R],
) -> PairsResult<()> {
    if left.len() != right.len() {
        return Err(PairsError::MisalignedSeries {
            context: context.into(),
            reason: format!("lengths differ: {} vs {}", left.len(), right.len()),
        });
    }
    if let Some((i, (l, r))) = left
        .iter()
        .zip(right)
        .enumerate()
        .find(|(_, (l, r))| l.timestamp() != r.timestamp())
    {
        return Err(PairsError::MisalignedSeries {
            context: context.into(),
            reason: format!(
                "timestamps differ at index {}: {} vs {}",
                i,
                l.timestamp(),
                r.timestamp()
            ),
        });
    }
    Ok(())
}

macro_rules! impl_series {
    ($series:ty, $point:ty) => {
        impl Timestamped for $point {
            fn timestamp(&self) -> NaiveDateTime {
                self.timestamp
            }
        }

        impl $series {
            pub fn len(&self) -> usize {
                self.points.len()
            }

            pub fn is_empty(&self) -> bool {
                self.points.is_empty()
            }

            pub fn points(&self) -> &[$point] {
                &self.points
            }

            pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
                self.points.iter().map(|p| p.timestamp)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Closing prices of both legs at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    /// Close of the first leg (the regression's dependent variable)
    pub close_a: Price,
    /// Close of the second leg (the regressor)
    pub close_b: Price,
}

impl Timestamped for PriceBar {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Gap-free, time-aligned closes for two instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub bars: Vec<PriceBar>,
}

impl PricePair {
    /// Build a validated price table.
    pub fn new(
        symbol_a: impl Into<String>,
        symbol_b: impl Into<String>,
        bars: Vec<PriceBar>,
    ) -> PairsResult<Self> {
        let pair = PricePair {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            bars,
        };
        pair.validate()?;
        Ok(pair)
    }

    /// Non-empty, strictly increasing timestamps, positive closes.
    pub fn validate(&self) -> PairsResult<()> {
        if self.bars.is_empty() {
            return Err(PairsError::InsufficientData(
                "Price table contains no bars".into(),
            ));
        }
        for (i, bar) in self.bars.iter().enumerate() {
            if bar.close_a <= Decimal::ZERO || bar.close_b <= Decimal::ZERO {
                return Err(PairsError::InvalidInput {
                    field: "bars".into(),
                    reason: format!(
                        "non-positive close at {} (a = {}, b = {})",
                        bar.timestamp, bar.close_a, bar.close_b
                    ),
                });
            }
            if i > 0 && bar.timestamp <= self.bars[i - 1].timestamp {
                return Err(PairsError::InvalidInput {
                    field: "bars".into(),
                    reason: format!(
                        "timestamps must be strictly increasing ({} follows {})",
                        bar.timestamp,
                        self.bars[i - 1].timestamp
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.bars.iter().map(|b| b.timestamp)
    }
}

// ---------------------------------------------------------------------------
// Hedge ratios
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgePoint {
    pub timestamp: NaiveDateTime,
    /// None until the rolling window has filled
    pub hedge_ratio: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeSeries {
    pub lookback: usize,
    pub points: Vec<HedgePoint>,
}

impl_series!(HedgeSeries, HedgePoint);

impl HedgeSeries {
    /// Number of leading bars without a hedge ratio.
    pub fn warmup_len(&self) -> usize {
        self.points
            .iter()
            .take_while(|p| p.hedge_ratio.is_none())
            .count()
    }
}

/// Drop the rows whose hedge ratio is undefined from both tables.
pub fn trim_warmup(
    prices: &PricePair,
    hedge: &HedgeSeries,
) -> PairsResult<(PricePair, HedgeSeries)> {
    ensure_aligned("trim_warmup", &prices.bars, &hedge.points)?;

    let (bars, points): (Vec<PriceBar>, Vec<HedgePoint>) = prices
        .bars
        .iter()
        .zip(&hedge.points)
        .filter(|(_, h)| h.hedge_ratio.is_some())
        .map(|(b, h)| (*b, *h))
        .unzip();

    Ok((
        PricePair {
            symbol_a: prices.symbol_a.clone(),
            symbol_b: prices.symbol_b.clone(),
            bars,
        },
        HedgeSeries {
            lookback: hedge.lookback,
            points,
        },
    ))
}

// ---------------------------------------------------------------------------
// Spread
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub timestamp: NaiveDateTime,
    pub hedge_ratio: Decimal,
    pub spread: Price,
    pub zscore: ZScore,
}

/// Spread and its full-sample z-score.
///
/// `mean` and `std_dev` describe the whole series, so early z-scores carry
/// information from later bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSeries {
    pub mean: Decimal,
    pub std_dev: Decimal,
    pub points: Vec<SpreadPoint>,
}

impl_series!(SpreadSeries, SpreadPoint);

impl SpreadSeries {
    pub fn spreads(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.spread).collect()
    }
}

// ---------------------------------------------------------------------------
// Signals and positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub timestamp: NaiveDateTime,
    pub zscore: ZScore,
    pub enter_long: bool,
    pub enter_short: bool,
    pub exit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub entry_threshold: Decimal,
    pub exit_threshold: Decimal,
    pub points: Vec<SignalPoint>,
}

impl_series!(SignalSeries, SignalPoint);

/// Exposure to the spread held over one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Long the spread: short leg A, long leg B
    Long,
    /// Short the spread: long leg A, short leg B
    Short,
    #[default]
    Flat,
}

impl Position {
    /// +1, -1 or 0
    pub fn sign(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Short => -1,
            Position::Flat => 0,
        }
    }

    pub fn as_decimal(self) -> Decimal {
        Decimal::from(self.sign())
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionPoint {
    pub timestamp: NaiveDateTime,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    pub points: Vec<PositionPoint>,
}

impl_series!(PositionSeries, PositionPoint);

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub timestamp: NaiveDateTime,
    pub position: Position,
    pub exposure_a: Price,
    pub exposure_b: Price,
    pub total: Price,
    pub period_return: Rate,
    /// Cumulative growth factor, 1.0 before the first bar
    pub equity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSeries {
    pub points: Vec<PortfolioPoint>,
}

impl_series!(PortfolioSeries, PortfolioPoint);

impl PortfolioSeries {
    /// Equity after the last bar; 1.0 when empty.
    pub fn final_equity(&self) -> Decimal {
        self.points.last().map_or(Decimal::ONE, |p| p.equity)
    }

    pub fn returns(&self) -> Vec<Rate> {
        self.points.iter().map(|p| p.period_return).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
