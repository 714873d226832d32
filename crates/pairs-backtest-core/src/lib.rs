pub mod backtest;
pub mod error;
pub mod hedge;
mod math;
pub mod performance;
pub mod portfolio;
pub mod series;
pub mod signals;
pub mod spread;
pub mod types;

pub use error::PairsError;
pub use types::*;

pub use backtest::{run_backtest, BacktestConfig, BacktestInput, BacktestOutput, BacktestRow};
pub use hedge::estimate_hedge;
pub use portfolio::compute_portfolio;
pub use series::{
    trim_warmup, HedgeSeries, PortfolioSeries, Position, PositionSeries, PriceBar, PricePair,
    SignalSeries, SpreadSeries,
};
pub use signals::{compute_positions, compute_signals, PositionStateMachine};
pub use spread::standardize_spread;

/// Standard result type for all pairs backtest operations
pub type PairsResult<T> = Result<T, PairsError>;
