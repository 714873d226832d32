//! Threshold signals and the long/short/flat position state machine.
//!
//! Signals are a stateless function of each bar's z-score. Positions are not:
//! a position, once entered, is held through the dead zone
//! `exit_threshold < |z| < entry_threshold` until an exit or an opposite entry.

use rust_decimal::Decimal;
use tracing::debug;

use crate::series::{
    Position, PositionPoint, PositionSeries, SignalPoint, SignalSeries, SpreadSeries,
};
use crate::{PairsError, PairsResult};

/// Both thresholds non-negative and `exit < entry`.
pub fn validate_thresholds(entry_threshold: Decimal, exit_threshold: Decimal) -> PairsResult<()> {
    let reject = |reason: &str| PairsError::InvalidThreshold {
        entry: entry_threshold,
        exit: exit_threshold,
        reason: reason.into(),
    };
    if entry_threshold < Decimal::ZERO || exit_threshold < Decimal::ZERO {
        return Err(reject("thresholds must be non-negative"));
    }
    if exit_threshold >= entry_threshold {
        return Err(reject("exit threshold must be strictly below entry threshold"));
    }
    Ok(())
}

/// Per-bar entry and exit flags.
///
/// `enter_long` when `z <= -entry`, `enter_short` when `z >= entry`,
/// `exit` when `|z| <= exit`.
pub fn compute_signals(
    spread: &SpreadSeries,
    entry_threshold: Decimal,
    exit_threshold: Decimal,
) -> PairsResult<SignalSeries> {
    validate_thresholds(entry_threshold, exit_threshold)?;

    let points = spread
        .points()
        .iter()
        .map(|p| SignalPoint {
            timestamp: p.timestamp,
            zscore: p.zscore,
            enter_long: p.zscore <= -entry_threshold,
            enter_short: p.zscore >= entry_threshold,
            exit: p.zscore.abs() <= exit_threshold,
        })
        .collect();

    Ok(SignalSeries {
        entry_threshold,
        exit_threshold,
        points,
    })
}

/// Sequential position tracker. Starts flat.
#[derive(Debug, Clone, Default)]
pub struct PositionStateMachine {
    state: Position,
}

impl PositionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Position {
        self.state
    }

    /// Advance one bar. Precedence: exit, then long entry, then short
    /// entry, otherwise hold.
    pub fn step(&mut self, signal: &SignalPoint) -> Position {
        self.state = if signal.exit {
            Position::Flat
        } else if signal.enter_long {
            Position::Long
        } else if signal.enter_short {
            Position::Short
        } else {
            self.state
        };
        self.state
    }
}

/// Run the spread's signals through a fresh state machine in time order.
pub fn compute_positions(
    spread: &SpreadSeries,
    entry_threshold: Decimal,
    exit_threshold: Decimal,
) -> PairsResult<PositionSeries> {
    let signals = compute_signals(spread, entry_threshold, exit_threshold)?;
    Ok(positions_from_signals(&signals))
}

/// Fold an already computed signal series into positions.
pub fn positions_from_signals(signals: &SignalSeries) -> PositionSeries {
    let mut machine = PositionStateMachine::new();
    let points: Vec<PositionPoint> = signals
        .points()
        .iter()
        .map(|s| PositionPoint {
            timestamp: s.timestamp,
            position: machine.step(s),
        })
        .collect();

    debug!(
        bars = points.len(),
        long = points.iter().filter(|p| p.position == Position::Long).count(),
        short = points.iter().filter(|p| p.position == Position::Short).count(),
        "computed positions"
    );

    PositionSeries { points }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
