use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::hedge::estimate_hedge;
use crate::performance::{summarize, PerformanceSummary};
use crate::portfolio::compute_portfolio;
use crate::series::{trim_warmup, Position, PricePair};
use crate::signals::{compute_signals, positions_from_signals, validate_thresholds};
use crate::spread::{
    spread_diagnostics, standardize_spread, validate_band, SpreadDiagnostics,
    MIN_DIAGNOSTIC_OBSERVATIONS,
};
use crate::types::{with_metadata, ComputationOutput, Price, Rate, ZScore};
use crate::PairsResult;

/// Strategy parameters. Every field has a default, so partial config files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Rolling regression window in bars (default 100)
    pub lookback: usize,
    /// |z| at or beyond which a position is opened (default 2.0)
    pub entry_threshold: Decimal,
    /// |z| at or within which any position is closed (default 1.0)
    pub exit_threshold: Decimal,
    /// Spread band for the diagnostic excursion counts (default 1.0)
    pub diagnostic_band: Decimal,
    /// Bars per year for annualisation (default 252)
    pub periods_per_year: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookback: 100,
            entry_threshold: dec!(2.0),
            exit_threshold: dec!(1.0),
            diagnostic_band: dec!(1.0),
            periods_per_year: dec!(252),
        }
    }
}

/// Input for a full pairs backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestInput {
    pub prices: PricePair,
    #[serde(default)]
    pub config: BacktestConfig,
}

/// One aligned row of every stage's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRow {
    pub timestamp: NaiveDateTime,
    pub close_a: Price,
    pub close_b: Price,
    pub hedge_ratio: Decimal,
    pub spread: Price,
    pub zscore: ZScore,
    pub enter_long: bool,
    pub enter_short: bool,
    pub exit: bool,
    pub position: Position,
    pub exposure_a: Price,
    pub exposure_b: Price,
    pub total: Price,
    pub period_return: Rate,
    pub equity: Decimal,
}

/// Output of a full pairs backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub symbol_a: String,
    pub symbol_b: String,
    /// Leading bars dropped because the regression window had not filled
    pub warmup_bars: usize,
    /// None when too few bars survive the warm-up for the ADF regression
    pub diagnostics: Option<SpreadDiagnostics>,
    pub performance: PerformanceSummary,
    pub rows: Vec<BacktestRow>,
}

/// Run hedge estimation, standardisation, positions and accounting end to end.
///
/// Thresholds are validated before any regression work. Warm-up bars without
/// a hedge ratio are dropped before the spread is standardised.
pub fn run_backtest(input: &BacktestInput) -> PairsResult<ComputationOutput<BacktestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let cfg = &input.config;

    validate_thresholds(cfg.entry_threshold, cfg.exit_threshold)?;
    validate_band(cfg.diagnostic_band)?;

    let hedge = estimate_hedge(&input.prices, cfg.lookback)?;
    let warmup_bars = hedge.warmup_len();
    let (prices, hedge) = trim_warmup(&input.prices, &hedge)?;

    let spread = standardize_spread(&prices, &hedge)?;
    let signals = compute_signals(&spread, cfg.entry_threshold, cfg.exit_threshold)?;
    let positions = positions_from_signals(&signals);
    let portfolio = compute_portfolio(&prices, &positions)?;

    let performance = summarize(&portfolio, cfg.periods_per_year)?;

    let lookahead = "Z-scores use the full-sample spread mean and standard deviation, \
                     so signals contain look-ahead information";
    debug!("{}", lookahead);
    warnings.push(lookahead.into());

    let mut conditional: Vec<String> = Vec::new();
    let diagnostics = if spread.len() >= MIN_DIAGNOSTIC_OBSERVATIONS {
        Some(spread_diagnostics(&spread, cfg.diagnostic_band)?)
    } else {
        conditional.push(format!(
            "Only {} bars after warm-up; spread diagnostics need at least {}",
            spread.len(),
            MIN_DIAGNOSTIC_OBSERVATIONS
        ));
        None
    };
    if let Some(d) = diagnostics.as_ref().filter(|d| !d.likely_stationary) {
        conditional.push(format!(
            "Spread ADF statistic {:.4} is above the 5% critical value; \
             mean reversion is not supported by the sample",
            d.adf_statistic
        ));
    }
    if performance.round_trips == 0 {
        conditional.push(format!(
            "No position was entered: |z| never reached {}",
            cfg.entry_threshold
        ));
    }
    for w in &conditional {
        warn!("{}", w);
    }
    warnings.extend(conditional);

    let rows: Vec<BacktestRow> = prices
        .bars
        .iter()
        .zip(spread.points())
        .zip(signals.points())
        .zip(portfolio.points())
        .map(|(((bar, s), sig), p)| BacktestRow {
            timestamp: bar.timestamp,
            close_a: bar.close_a,
            close_b: bar.close_b,
            hedge_ratio: s.hedge_ratio,
            spread: s.spread,
            zscore: s.zscore,
            enter_long: sig.enter_long,
            enter_short: sig.enter_short,
            exit: sig.exit,
            position: p.position,
            exposure_a: p.exposure_a,
            exposure_b: p.exposure_b,
            total: p.total,
            period_return: p.period_return,
            equity: p.equity,
        })
        .collect();

    info!(
        symbol_a = %input.prices.symbol_a,
        symbol_b = %input.prices.symbol_b,
        bars = rows.len(),
        warmup_bars,
        round_trips = performance.round_trips,
        final_equity = %performance.final_equity,
        "pairs backtest complete"
    );

    let output = BacktestOutput {
        symbol_a: input.prices.symbol_a.clone(),
        symbol_b: input.prices.symbol_b.clone(),
        warmup_bars,
        diagnostics,
        performance,
        rows,
    };

    let bars_processed = input.prices.len();
    Ok(with_metadata(
        "Pairs trading backtest: rolling through-origin OLS hedge ratio, full-sample spread z-score, \
         threshold state machine with dead-zone hold, exposure-change equity curve",
        cfg,
        warnings,
        bars_processed,
        start,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceBar;
    use crate::PairsError;
    use chrono::{Duration, NaiveDate};

    /// Deterministic cointegrated pair: a tracks 2b with a mean-reverting wiggle.
    fn make_input(n: usize, lookback: usize) -> BacktestInput {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let noise = [dec!(0.0), dec!(1.5), dec!(3.0), dec!(-0.5), dec!(-3.0), dec!(-1.0)];
        let bars = (0..n)
            .map(|i| {
                let b = dec!(50) + Decimal::from((i % 7) as i64) * dec!(0.25);
                PriceBar {
                    timestamp: start + Duration::minutes(i as i64),
                    close_a: dec!(2) * b + noise[i % noise.len()] + dec!(10),
                    close_b: b,
                }
            })
            .collect();
        BacktestInput {
            prices: PricePair::new("SPY", "IWM", bars).unwrap(),
            config: BacktestConfig {
                lookback,
                ..BacktestConfig::default()
            },
        }
    }

    #[test]
    fn test_default_config_values() {
        let cfg = BacktestConfig::default();
        assert_eq!(cfg.lookback, 100);
        assert_eq!(cfg.entry_threshold, dec!(2.0));
        assert_eq!(cfg.exit_threshold, dec!(1.0));
    }

    #[test]
    fn test_partial_config_deserialises_with_defaults() {
        let cfg: BacktestConfig = serde_json::from_str(r#"{"lookback": 30}"#).unwrap();
        assert_eq!(cfg.lookback, 30);
        assert_eq!(cfg.entry_threshold, dec!(2.0));
        assert_eq!(cfg.periods_per_year, dec!(252));
    }

    #[test]
    fn test_rows_exclude_warmup() {
        let input = make_input(60, 10);
        let out = run_backtest(&input).unwrap();
        assert_eq!(out.result.warmup_bars, 9);
        assert_eq!(out.result.rows.len(), 51);
        assert_eq!(
            out.result.rows[0].timestamp,
            input.prices.bars[9].timestamp
        );
    }

    #[test]
    fn test_equity_positive_everywhere() {
        let out = run_backtest(&make_input(120, 12)).unwrap();
        assert!(out.result.rows.iter().all(|r| r.equity > Decimal::ZERO));
        assert_eq!(
            out.result.performance.final_equity,
            out.result.rows.last().unwrap().equity
        );
    }

    #[test]
    fn test_lookahead_warning_always_present() {
        let out = run_backtest(&make_input(60, 10)).unwrap();
        assert!(out.warnings[0].contains("look-ahead"));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_short_sample_skips_diagnostics() {
        // lookback 2 over 3 bars leaves 2 spread points: enough to standardise
        let out = run_backtest(&make_input(3, 2)).unwrap();
        assert_eq!(out.result.rows.len(), 2);
        assert!(out.result.diagnostics.is_none());
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("spread diagnostics need at least 3")));
        assert!(out.warnings[0].contains("look-ahead"));
    }

    #[test]
    fn test_negative_band_rejected_before_regression() {
        let mut input = make_input(3, 2);
        input.config.diagnostic_band = dec!(-1);
        assert!(matches!(
            run_backtest(&input),
            Err(PairsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_invalid_thresholds_fail_fast() {
        let mut input = make_input(60, 10);
        input.config.exit_threshold = dec!(2.0);
        let result = run_backtest(&input);
        assert!(matches!(result, Err(PairsError::InvalidThreshold { .. })));
    }

    #[test]
    fn test_lookback_too_long() {
        let input = make_input(20, 50);
        assert!(matches!(
            run_backtest(&input),
            Err(PairsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_output_serialization() {
        let out = run_backtest(&make_input(40, 5)).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("hedge_ratio"));
        assert!(json.contains("max_drawdown"));
        assert!(json.contains("adf_statistic"));
    }
}
