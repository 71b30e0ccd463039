//! ExecLab CLI: run, fill, and validate commands.
//!
//! Commands:
//! - `run`: load a TOML run config, backtest every symbol, print a ranking, optionally write JSON
//! - `fill`: one-shot partial fill simulation for an order against a single bar
//! - `validate`: parse and validate a run config without running it

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use execlab_core::domain::{Market, OrderSide, PriceBar};
use execlab_core::fill::PartialFillSimulator;
use execlab_core::slippage::SlippageModel;
use execlab_core::ExecConfig;
use execlab_runner::config::{DataSourceConfig, RunConfig};
use execlab_runner::runner::{run_from_config, RunSummary};

#[derive(Parser)]
#[command(
    name = "execlab",
    about = "ExecLab CLI: execution-aware backtesting with slippage and partial fills"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every symbol in a TOML run config.
    Run {
        /// Path to the run config.
        #[arg(long)]
        config: PathBuf,

        /// Write the full run summary as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the full run summary as JSON instead of the table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Simulate one market order against one bar and print the fill as JSON.
    Fill {
        /// Reference price.
        #[arg(long)]
        price: f64,

        /// Order quantity.
        #[arg(long)]
        qty: f64,

        #[arg(long, value_enum, default_value_t = SideArg::Buy)]
        side: SideArg,

        /// Bar volume.
        #[arg(long)]
        volume: f64,

        /// Bar open; defaults to the reference price.
        #[arg(long)]
        open: Option<f64>,

        /// Bar high; defaults to max(open, price).
        #[arg(long)]
        high: Option<f64>,

        /// Bar low; defaults to min(open, price).
        #[arg(long)]
        low: Option<f64>,

        /// Bar timestamp (RFC 3339); defaults to now.
        #[arg(long)]
        timestamp: Option<String>,

        /// Average daily volume; enables ADV-based market impact.
        #[arg(long)]
        adv: Option<f64>,

        /// US, KR or CRYPTO.
        #[arg(long, default_value = "US")]
        market: Market,

        /// Engine config TOML (`[slippage]`, `[fill]` sections).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse and validate a run config.
    Validate {
        /// Path to the run config.
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => OrderSide::Buy,
            SideArg::Sell => OrderSide::Sell,
        }
    }
}

fn setup_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Run {
            config,
            output,
            json,
        } => run_cmd(&config, output.as_deref(), json),
        Commands::Fill {
            price,
            qty,
            side,
            volume,
            open,
            high,
            low,
            timestamp,
            adv,
            market,
            config,
        } => {
            let open = open.unwrap_or(price);
            let bar_spec = BarSpec {
                open,
                high: high.unwrap_or(open.max(price)),
                low: low.unwrap_or(open.min(price)),
                close: price,
                volume,
                timestamp,
            };
            fill_cmd(price, qty, side.into(), bar_spec, adv, market, config.as_deref())
        }
        Commands::Validate { config } => validate_cmd(&config),
    }
}

fn run_cmd(config_path: &Path, output: Option<&Path>, json: bool) -> Result<()> {
    let config = RunConfig::from_path(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), symbols = config.symbols.len(), "run config loaded");
    let summary = run_from_config(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(path) = output {
        let text = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        if !json {
            println!("Summary written to: {}", path.display());
        }
    }

    if summary.reports.is_empty() {
        bail!("no symbol produced a report");
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Signal: {}", summary.signal);
    println!(
        "{:<4} {:<10} {:<7} {:>7} {:>9} {:>11} {:>10}",
        "#", "Symbol", "Market", "Trades", "Win %", "Return %", "Dir. acc %"
    );
    println!("{}", "-".repeat(64));
    for entry in &summary.ranking {
        let accuracy = summary
            .reports
            .iter()
            .find(|r| r.symbol == entry.symbol)
            .map(|r| r.directional_accuracy)
            .unwrap_or(0.0);
        println!(
            "{:<4} {:<10} {:<7} {:>7} {:>9.2} {:>11.2} {:>10.2}",
            entry.rank,
            entry.symbol,
            entry.market,
            entry.total_trades,
            entry.win_rate,
            entry.total_return,
            accuracy
        );
    }

    let unranked: Vec<&str> = summary
        .reports
        .iter()
        .filter(|r| !summary.ranking.iter().any(|e| e.symbol == r.symbol))
        .map(|r| r.symbol.as_str())
        .collect();
    if !unranked.is_empty() {
        println!("Screened out (too few trades): {}", unranked.join(", "));
    }
    if !summary.synthetic_symbols.is_empty() {
        println!("Synthetic data: {}", summary.synthetic_symbols.join(", "));
    }
    for failure in &summary.failures {
        eprintln!("FAILED {}: {}", failure.symbol, failure.error);
    }
    println!(
        "Cache: {} entries, {} hits, {} misses ({} ms)",
        summary.cache.entries, summary.cache.hits, summary.cache.misses, summary.elapsed_ms
    );
}

struct BarSpec {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    timestamp: Option<String>,
}

fn fill_cmd(
    price: f64,
    qty: f64,
    side: OrderSide,
    bar: BarSpec,
    adv: Option<f64>,
    market: Market,
    config_path: Option<&Path>,
) -> Result<()> {
    let exec = match config_path {
        Some(path) => ExecConfig::from_path(path)?,
        None => ExecConfig::default(),
    };
    let slippage_config = match adv {
        Some(adv) => exec.slippage.clone().with_adv(adv),
        None => exec.slippage.clone(),
    };

    let timestamp = match bar.timestamp.as_deref() {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --timestamp '{s}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let bar = PriceBar::new(timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume);

    let mut sim = PartialFillSimulator::new(exec.fill, SlippageModel::new(slippage_config)?, market)?;
    let result = sim.simulate_fill(price, qty, side, &bar, 0);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn validate_cmd(config_path: &Path) -> Result<()> {
    let config = RunConfig::from_path(config_path)
        .with_context(|| format!("validating {}", config_path.display()))?;

    println!("OK: {}", config_path.display());
    println!("  symbols: {}", config.symbols.len());
    for symbol in &config.symbols {
        let source = match symbol.source()? {
            DataSourceConfig::Csv(path) => {
                let marker = if path.exists() { "" } else { " (missing)" };
                format!("csv {}{marker}", path.display())
            }
            DataSourceConfig::Synthetic(s) => format!("synthetic, {} bars", s.bars),
        };
        println!("  - {} [{}] {}", symbol.name, symbol.market, source);
    }
    println!("  signal: {}", config.signal.build()?.name());
    println!("  stats mode: {:?}", config.backtest.stats_mode);
    Ok(())
}
