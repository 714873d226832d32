mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::backtest::{BacktestArgs, HedgeArgs, SpreadArgs};

/// Pairs trading backtests on two co-moving price series
#[derive(Parser)]
#[command(
    name = "pairs",
    version,
    about = "Pairs trading backtests on two co-moving price series",
    long_about = "Estimates a rolling hedge ratio between two instruments, standardises \
                  the spread into a z-score, converts threshold crossings into \
                  long/flat/short positions and accumulates the equity curve. \
                  Set RUST_LOG=debug for per-stage logging on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full backtest: hedge ratio, z-score, positions, equity curve
    Backtest(BacktestArgs),
    /// Rolling hedge ratio only
    Hedge(HedgeArgs),
    /// Spread and z-score with stationarity diagnostics
    Spread(SpreadArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Backtest(args) => commands::backtest::run_backtest_cmd(args),
        Commands::Hedge(args) => commands::backtest::run_hedge(args),
        Commands::Spread(args) => commands::backtest::run_spread(args),
        Commands::Version => {
            println!("pairs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
