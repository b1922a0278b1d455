//! TradeSim CLI: run, compare, and synth commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save its artifacts
//! - `compare`: run the reference strategy set side by side over one series
//! - `synth`: write a seeded synthetic price series to CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tradesim_core::data::BarSource;
use tradesim_core::engine::{EngineConfig, FillPolicy};
use tradesim_runner::data_loader::{generate_synthetic_bars, write_bars_csv};
use tradesim_runner::export::{render_comparison_table, render_summary};
use tradesim_runner::runner::{run_single_backtest, COMPARISON_CASH};
use tradesim_runner::{
    compare, default_comparison_set, load_series, save_artifacts, BacktestConfig, CsvSource,
    LoadOptions, SyntheticSource,
};

#[derive(Parser)]
#[command(
    name = "tradesim",
    about = "TradeSim CLI: bar-by-bar strategy backtesting"
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts. A subdirectory per run id is created.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Compare MA crossover, monthly accumulation, and lump sum over one series.
    Compare {
        /// Symbol to compare on.
        #[arg(long)]
        symbol: String,

        /// CSV file with the bars. Synthetic bars are used when omitted.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Seed for synthetic bars (ignored with --data).
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Start date (YYYY-MM-DD). Defaults to the first bar, or 2020-01-01 for synthetic bars.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the last bar, or 2023-12-31 for synthetic bars.
        #[arg(long)]
        end: Option<String>,

        /// Initial cash for every strategy.
        #[arg(long, default_value_t = COMPARISON_CASH)]
        cash: f64,

        /// Commission rate applied to every fill.
        #[arg(long, default_value_t = 0.0)]
        commission: f64,

        /// Fill policy: at_close or next_open.
        #[arg(long, default_value = "at_close")]
        fill_policy: FillPolicy,
    },
    /// Write a seeded synthetic price series to CSV.
    Synth {
        /// Symbol the series is generated for (part of the seed).
        #[arg(long)]
        symbol: String,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-12-31")]
        end: String,

        /// Random seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            no_save,
        } => run_backtest_cmd(&config, &output_dir, no_save),
        Commands::Compare {
            symbol,
            data,
            seed,
            start,
            end,
            cash,
            commission,
            fill_policy,
        } => run_compare(
            &symbol,
            data.as_deref(),
            seed,
            start.as_deref(),
            end.as_deref(),
            EngineConfig::frictionless(cash)
                .with_commission(commission)
                .with_fill_policy(fill_policy),
        ),
        Commands::Synth {
            symbol,
            out,
            start,
            end,
            seed,
        } => run_synth(&symbol, &out, &start, &end, seed),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path, no_save: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let result = run_single_backtest(&config)?;
    print!("{}", render_summary(&result.report));

    if no_save {
        return Ok(());
    }

    let run_dir = output_dir.join(&result.run_id[..12]);
    let written = save_artifacts(&result, &run_dir)?;
    info!(files = written.len(), dir = %run_dir.display(), "artifacts saved");
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_compare(
    symbol: &str,
    data: Option<&Path>,
    seed: u64,
    start: Option<&str>,
    end: Option<&str>,
    engine_config: EngineConfig,
) -> Result<()> {
    let symbol = symbol.trim().to_uppercase();
    engine_config.validate()?;

    let (default_start, default_end) = match data {
        Some(_) => (NaiveDate::MIN, NaiveDate::MAX),
        None => (parse_date("2020-01-01")?, parse_date("2023-12-31")?),
    };
    let start = start.map(parse_date).transpose()?.unwrap_or(default_start);
    let end = end.map(parse_date).transpose()?.unwrap_or(default_end);
    if end < start {
        bail!("--end {end} precedes --start {start}");
    }
    let opts = LoadOptions::new(start, end);

    let source: Box<dyn BarSource> = match data {
        Some(path) => Box::new(CsvSource::open(&symbol, path)?),
        None => Box::new(SyntheticSource::new(seed)),
    };
    let loaded = load_series(source.as_ref(), &symbol, &opts, data.is_none())?;

    let rows = compare(&loaded.series, &default_comparison_set(), &engine_config)?;
    println!(
        "{} {} .. {} ({} bars, initial cash {:.2})",
        symbol,
        loaded.series.start().date(),
        loaded.series.end().date(),
        loaded.series.len(),
        engine_config.initial_cash
    );
    print!("{}", render_comparison_table(&rows));
    Ok(())
}

fn run_synth(symbol: &str, out: &Path, start: &str, end: &str, seed: u64) -> Result<()> {
    let symbol = symbol.trim().to_uppercase();
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if end < start {
        bail!("--end {end} precedes --start {start}");
    }

    let bars = generate_synthetic_bars(&symbol, start, end, seed);
    if bars.is_empty() {
        bail!("no weekdays between {start} and {end}");
    }
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_bars_csv(out, &bars)?;
    println!("Wrote {} bars for {} to {}", bars.len(), symbol, out.display());
    Ok(())
}
