//! Confluence CLI: analyze candle files and print ranked trade setups.
//!
//! Commands:
//! - `analyze`: run the pipeline over a CSV candle file
//! - `demo`: run several symbols on seeded synthetic data through the async runner
//! - `config`: print the default configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use confluence_core::domain::{StrategyKind, Timeframe};
use confluence_core::setups::parse_strategy;
use confluence_core::AnalysisResult;
use confluence_runner::{
    csv_series, synthetic_series, InMemoryMarketData, Runner, RunnerConfig, SymbolRun,
};

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence: market structure analysis and trade setup scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a CSV file with time,open,high,low,close,volume columns.
    Analyze {
        /// Path to the candle CSV.
        file: PathBuf,

        /// Symbol name used in ids and output.
        #[arg(long, default_value = "UNKNOWN")]
        symbol: String,

        /// Candle timeframe (1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w).
        #[arg(long, default_value = "1h")]
        timeframe: String,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated strategies (order_block, liquidity_sweep, wyckoff, breaker_flip, scalp).
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<String>,

        /// Print the full result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Analyze seeded synthetic data for one or more symbols.
    Demo {
        /// Symbols to generate.
        #[arg(default_values_t = ["BTCUSDT".to_string(), "ETHUSDT".to_string()])]
        symbols: Vec<String>,

        /// Candle timeframe.
        #[arg(long, default_value = "1h")]
        timeframe: String,

        /// Candles generated per symbol.
        #[arg(long, default_value_t = 500)]
        candles: usize,

        /// Print the full results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            symbol,
            timeframe,
            config,
            strategies,
            json,
        } => run_analyze(file, symbol, &timeframe, config, &strategies, json),
        Commands::Demo {
            symbols,
            timeframe,
            candles,
            json,
        } => run_demo(symbols, &timeframe, candles, json).await,
        Commands::Config => {
            print!("{}", RunnerConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn run_analyze(
    file: PathBuf,
    symbol: String,
    timeframe: &str,
    config_path: Option<PathBuf>,
    strategies: &[String],
    json: bool,
) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let mut config = match config_path {
        Some(path) => RunnerConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunnerConfig::default(),
    };
    if !strategies.is_empty() {
        config.analysis.strategies = parse_strategies(strategies)?;
    }

    let series = csv_series(&symbol, timeframe, &file)?;
    info!(symbol = %symbol, candles = series.candles.len(), "loaded csv");

    let runner = Runner::new(config, Arc::new(InMemoryMarketData::new()), Vec::new(), None)?;
    let runs = runner.analyze_loaded(&[series]);
    report(runs, json)
}

async fn run_demo(symbols: Vec<String>, timeframe: &str, candles: usize, json: bool) -> Result<()> {
    let timeframe: Timeframe = timeframe.parse()?;
    let end_ms = now_ms();

    // Higher timeframe history too, so the demo exercises the MTF bias.
    let mut market = InMemoryMarketData::new();
    for symbol in &symbols {
        market = market.with_history(
            symbol,
            timeframe,
            synthetic_series(symbol, timeframe, candles, end_ms).candles,
        );
        if let Some(higher) = timeframe.higher() {
            market = market.with_history(
                symbol,
                higher,
                synthetic_series(symbol, higher, candles, end_ms).candles,
            );
        }
    }

    let config = RunnerConfig {
        history_limit: candles.max(RunnerConfig::default().analysis.min_candles),
        ..RunnerConfig::default()
    };
    let runner = Runner::new(config, Arc::new(market), Vec::new(), None)?;
    eprintln!("WARNING: demo results are based on SYNTHETIC data");
    let runs = runner.analyze_symbols(&symbols, timeframe).await;
    report(runs, json)
}

fn parse_strategies(names: &[String]) -> Result<Vec<StrategyKind>> {
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        kinds.push(parse_strategy(name)?);
    }
    if kinds.is_empty() {
        bail!("at least one strategy is required");
    }
    Ok(kinds)
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

fn report(runs: Vec<SymbolRun>, json: bool) -> Result<()> {
    let mut failures = 0;
    let mut results = Vec::new();
    for run in runs {
        match run.result {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("Error for {}: {e}", run.symbol);
                failures += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_summary(result);
        }
    }

    if failures > 0 && results.is_empty() {
        bail!("all {failures} symbol(s) failed");
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let state = &result.market_state;
    println!();
    println!("=== {} {} ===", result.symbol, result.timeframe);
    println!("Price:          {:.4}", state.current_price);
    println!("ATR:            {:.4}", state.atr);
    println!(
        "Regime:         {} (trend {}, strength {:.0})",
        state.regime.regime, state.regime.trend.direction, state.regime.trend.strength
    );
    println!(
        "Cycle:          {:?} -> {:?} ({:.0}%)",
        result.regime_transition.current,
        result.regime_transition.next,
        result.regime_transition.probability
    );
    println!(
        "Prediction:     {:?} {} ({:.0}% confidence)",
        result.prediction.scenario, result.prediction.direction, result.prediction.confidence
    );
    println!("Structure:      {} markers", result.structures.len());
    println!("Config:         {}", result.config_hash.short());

    if result.cooldown.active {
        println!();
        println!(
            "COOLDOWN: {} ({} min remaining)",
            result.cooldown.reason.as_deref().unwrap_or("active"),
            result.cooldown.remaining_ms / 60_000
        );
    }

    println!();
    if result.setups.is_empty() {
        println!("No setups above the score threshold.");
    } else {
        println!(
            "{:<16} {:<16} {:<6} {:>12} {:>12} {:>12} {:>6} {:>6}",
            "Id", "Strategy", "Side", "Entry", "Stop", "Target", "R:R", "Score"
        );
        println!("{}", "-".repeat(94));
        for setup in &result.setups {
            let first = setup.targets.first();
            println!(
                "{:<16} {:<16} {:<6} {:>12.4} {:>12.4} {:>12.4} {:>6.2} {:>6.1}",
                setup.id,
                setup.strategy,
                format!("{:?}", setup.direction),
                setup.entry_zone.optimal,
                setup.stop_loss,
                first.map_or(f64::NAN, |t| t.price),
                first.map_or(0.0, |t| t.risk_reward),
                setup.quant_score
            );
        }
    }

    if !result.trap_zones.is_empty() {
        println!();
        println!("--- Traps ---");
        for trap in &result.trap_zones {
            println!("  {:?} at {:.4} (traps {}, candle {})", trap.kind, trap.price, trap.trapped, trap.index);
        }
    }
    if !result.roadmap.is_empty() {
        println!();
        println!("--- Roadmap ---");
        for step in &result.roadmap {
            println!(
                "  {:?} {:.4} ({:.1} ATR, urgency {:.0})",
                step.kind, step.price, step.distance_atr, step.urgency
            );
        }
    }
    println!();
}
