use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

use pairs_backtest_core::spread::spread_diagnostics;
use pairs_backtest_core::{
    estimate_hedge, run_backtest, standardize_spread, trim_warmup, BacktestConfig, BacktestInput,
};

use crate::input;

/// Where the two price legs come from
#[derive(Args)]
pub struct PriceSourceArgs {
    /// Path to a JSON or YAML backtest input ({"prices": ..., "config": ...}); stdin is used when omitted
    #[arg(long, conflicts_with_all = ["leg_a", "leg_b"])]
    pub input: Option<String>,

    /// CSV bar file for the first leg (dependent variable of the hedge regression)
    #[arg(long, requires = "leg_b")]
    pub leg_a: Option<String>,

    /// CSV bar file for the second leg (regressor)
    #[arg(long, requires = "leg_a")]
    pub leg_b: Option<String>,

    /// Symbol of the first leg (defaults to the file stem)
    #[arg(long)]
    pub symbol_a: Option<String>,

    /// Symbol of the second leg (defaults to the file stem)
    #[arg(long)]
    pub symbol_b: Option<String>,

    /// JSON or YAML file with strategy parameters
    #[arg(long)]
    pub config: Option<String>,

    /// Rolling regression window in bars
    #[arg(long)]
    pub lookback: Option<usize>,
}

/// Arguments for a full backtest
#[derive(Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub source: PriceSourceArgs,

    /// |z| at or beyond which a position is opened
    #[arg(long)]
    pub entry: Option<Decimal>,

    /// |z| at or within which a position is closed
    #[arg(long)]
    pub exit: Option<Decimal>,

    /// Spread band for the diagnostic excursion counts
    #[arg(long)]
    pub band: Option<Decimal>,

    /// Bars per year used to annualise returns
    #[arg(long)]
    pub periods_per_year: Option<Decimal>,

    /// Emit the per-bar table instead of the summary
    #[arg(long)]
    pub rows: bool,
}

/// Arguments for the rolling hedge ratio alone
#[derive(Args)]
pub struct HedgeArgs {
    #[command(flatten)]
    pub source: PriceSourceArgs,
}

/// Arguments for the spread, z-score and diagnostics
#[derive(Args)]
pub struct SpreadArgs {
    #[command(flatten)]
    pub source: PriceSourceArgs,

    /// Spread band for the diagnostic excursion counts
    #[arg(long)]
    pub band: Option<Decimal>,

    /// Emit the per-bar spread and z-score instead of the diagnostics
    #[arg(long)]
    pub rows: bool,
}

pub fn run_backtest_cmd(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let overrides = ConfigOverrides {
        lookback: args.source.lookback,
        entry_threshold: args.entry,
        exit_threshold: args.exit,
        diagnostic_band: args.band,
        periods_per_year: args.periods_per_year,
    };
    let backtest_input = load_input(&args.source, &overrides)?;

    let output = run_backtest(&backtest_input)?;
    if args.rows {
        return Ok(json!({ "results": output.result.rows }));
    }

    let mut value = serde_json::to_value(output)?;
    if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
        result.remove("rows");
    }
    Ok(value)
}

pub fn run_hedge(args: HedgeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let overrides = ConfigOverrides {
        lookback: args.source.lookback,
        ..ConfigOverrides::default()
    };
    let backtest_input = load_input(&args.source, &overrides)?;
    let hedge = estimate_hedge(&backtest_input.prices, backtest_input.config.lookback)?;
    Ok(json!({ "results": hedge.points }))
}

pub fn run_spread(args: SpreadArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let overrides = ConfigOverrides {
        lookback: args.source.lookback,
        diagnostic_band: args.band,
        ..ConfigOverrides::default()
    };
    let backtest_input = load_input(&args.source, &overrides)?;
    let cfg = &backtest_input.config;
    let hedge = estimate_hedge(&backtest_input.prices, cfg.lookback)?;
    let (prices, hedge) = trim_warmup(&backtest_input.prices, &hedge)?;
    let spread = standardize_spread(&prices, &hedge)?;
    if args.rows {
        return Ok(json!({ "results": spread.points }));
    }
    let diagnostics = spread_diagnostics(&spread, cfg.diagnostic_band)?;
    Ok(json!({ "result": diagnostics }))
}

/// Individual strategy flags; each one set wins over every config source.
#[derive(Debug, Default)]
struct ConfigOverrides {
    lookback: Option<usize>,
    entry_threshold: Option<Decimal>,
    exit_threshold: Option<Decimal>,
    diagnostic_band: Option<Decimal>,
    periods_per_year: Option<Decimal>,
}

/// Precedence: defaults, then the input's embedded config, then `--config`
/// (which replaces the embedded one wholesale), then individual flags.
fn resolve_config(
    embedded: BacktestConfig,
    file: Option<BacktestConfig>,
    overrides: &ConfigOverrides,
) -> BacktestConfig {
    let mut cfg = file.unwrap_or(embedded);
    apply_overrides(&mut cfg, overrides);
    cfg
}

fn apply_overrides(cfg: &mut BacktestConfig, overrides: &ConfigOverrides) {
    if let Some(lookback) = overrides.lookback {
        cfg.lookback = lookback;
    }
    if let Some(entry) = overrides.entry_threshold {
        cfg.entry_threshold = entry;
    }
    if let Some(exit) = overrides.exit_threshold {
        cfg.exit_threshold = exit;
    }
    if let Some(band) = overrides.diagnostic_band {
        cfg.diagnostic_band = band;
    }
    if let Some(periods) = overrides.periods_per_year {
        cfg.periods_per_year = periods;
    }
}

/// Assemble prices and the resolved config.
fn load_input(
    source: &PriceSourceArgs,
    overrides: &ConfigOverrides,
) -> Result<BacktestInput, Box<dyn std::error::Error>> {
    let mut backtest_input: BacktestInput = match (&source.leg_a, &source.leg_b) {
        (Some(path_a), Some(path_b)) => {
            let symbol_a = source.symbol_a.clone().unwrap_or_else(|| file_stem(path_a));
            let symbol_b = source.symbol_b.clone().unwrap_or_else(|| file_stem(path_b));
            let leg_a = input::bars::read_closes(path_a)?;
            let leg_b = input::bars::read_closes(path_b)?;
            BacktestInput {
                prices: input::bars::join_legs(&symbol_a, &symbol_b, &leg_a, &leg_b)?,
                config: BacktestConfig::default(),
            }
        }
        _ => {
            if let Some(ref path) = source.input {
                input::file::read_structured(path)?
            } else if let Some(piped) = input::stdin::read_stdin()? {
                piped
            } else {
                return Err(
                    "--leg-a/--leg-b <bars.csv>, --input <file.json> or stdin required".into(),
                );
            }
        }
    };

    let file_config: Option<BacktestConfig> = source
        .config
        .as_deref()
        .map(input::file::read_structured::<BacktestConfig>)
        .transpose()?;
    backtest_input.config = resolve_config(backtest_input.config, file_config, overrides);

    if let Some(ref s) = source.symbol_a {
        backtest_input.prices.symbol_a = s.clone();
    }
    if let Some(ref s) = source.symbol_b {
        backtest_input.prices.symbol_b = s.clone();
    }

    debug!(
        bars = backtest_input.prices.len(),
        config = ?backtest_input.config,
        "loaded backtest input"
    );
    Ok(backtest_input)
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn embedded() -> BacktestConfig {
        BacktestConfig {
            lookback: 40,
            entry_threshold: dec!(2.5),
            exit_threshold: dec!(0.5),
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn test_embedded_config_kept_without_file_or_flags() {
        let cfg = resolve_config(embedded(), None, &ConfigOverrides::default());
        assert_eq!(cfg, embedded());
    }

    #[test]
    fn test_config_file_replaces_embedded_config() {
        // Fields missing from the file fall back to defaults, not to the embedded values
        let file: BacktestConfig = serde_json::from_str(r#"{"lookback": 60}"#).unwrap();
        let cfg = resolve_config(embedded(), Some(file), &ConfigOverrides::default());
        assert_eq!(cfg.lookback, 60);
        assert_eq!(cfg.entry_threshold, dec!(2.0));
        assert_eq!(cfg.exit_threshold, dec!(1.0));
    }

    #[test]
    fn test_flags_win_over_file_and_embedded() {
        let file = BacktestConfig {
            lookback: 60,
            entry_threshold: dec!(3.0),
            exit_threshold: dec!(1.5),
            ..BacktestConfig::default()
        };
        let overrides = ConfigOverrides {
            lookback: Some(20),
            entry_threshold: Some(dec!(1.8)),
            exit_threshold: Some(dec!(0.3)),
            ..ConfigOverrides::default()
        };
        let cfg = resolve_config(embedded(), Some(file), &overrides);
        assert_eq!(cfg.lookback, 20);
        assert_eq!(cfg.entry_threshold, dec!(1.8));
        assert_eq!(cfg.exit_threshold, dec!(0.3));
        assert_eq!(cfg.periods_per_year, dec!(252));
    }

    #[test]
    fn test_flags_win_over_embedded_without_file() {
        let overrides = ConfigOverrides {
            entry_threshold: Some(dec!(3.0)),
            diagnostic_band: Some(dec!(0.5)),
            ..ConfigOverrides::default()
        };
        let cfg = resolve_config(embedded(), None, &overrides);
        assert_eq!(cfg.lookback, 40);
        assert_eq!(cfg.entry_threshold, dec!(3.0));
        assert_eq!(cfg.exit_threshold, dec!(0.5));
        assert_eq!(cfg.diagnostic_band, dec!(0.5));
    }

    #[test]
    fn test_file_stem_symbol_default() {
        assert_eq!(file_stem("data/1_min_SPY_data.csv"), "1_min_SPY_data");
        assert_eq!(file_stem("IWM"), "IWM");
    }
}
