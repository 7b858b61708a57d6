mod analysis;
mod costs;
mod data;
mod engine;
mod error;
mod indicators;
mod types;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use analysis::{MonteCarloConfig, MonteCarloSimulator};
use data::JsonBarFile;
use engine::{BacktestOrchestrator, BacktestRequest};
use types::{Direction, SignalSpec};

#[derive(Parser)]
#[command(name = "backtest-validator")]
#[command(version = "0.1.0")]
#[command(about = "Backtest validation engine: simulation, Monte Carlo, walk-forward and reality checks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a signal against historical candles
    Run {
        /// JSON file with an array of OHLCV bars
        #[arg(short, long)]
        bars: String,
        /// Trading symbol, e.g. BTC/USDT
        #[arg(long, default_value = "BTC/USDT")]
        symbol: String,
        /// Candle timeframe label, e.g. 1h
        #[arg(long, default_value = "1h")]
        timeframe: String,
        /// Trade direction: long or short
        #[arg(short, long, default_value = "long")]
        direction: String,
        /// Stop-loss distance in ATR multiples
        #[arg(long, default_value = "2.0")]
        stop_atr: f64,
        /// Take-profit distance in ATR multiples
        #[arg(long, default_value = "3.0")]
        target_atr: f64,
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,
        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: String,
        /// Initial capital
        #[arg(long, default_value = "10000")]
        capital: f64,
        /// Risk per trade as a percentage of capital
        #[arg(long, default_value = "2")]
        risk: f64,
        /// Monte Carlo simulation count
        #[arg(long, default_value = "10000")]
        simulations: usize,
        /// Walk-forward in-sample share, 0-100
        #[arg(long, default_value = "70")]
        in_sample_pct: f64,
        /// Walk-forward window length in days
        #[arg(long, default_value = "30")]
        window_days: i64,
        /// RNG seed for reproducible Monte Carlo runs
        #[arg(long)]
        seed: Option<u64>,
        /// Generate a synthetic ledger when bars cannot be loaded
        #[arg(long)]
        synthetic_fallback: bool,
        /// Write the full report as JSON to this path
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Monte Carlo resampling over a raw list of trade P&L values
    Montecarlo {
        /// JSON file with an array of P&L numbers
        #[arg(short, long)]
        pnls: String,
        /// Initial capital
        #[arg(long, default_value = "10000")]
        capital: f64,
        /// Simulation count
        #[arg(long, default_value = "10000")]
        simulations: usize,
        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            bars,
            symbol,
            timeframe,
            direction,
            stop_atr,
            target_atr,
            start,
            end,
            capital,
            risk,
            simulations,
            in_sample_pct,
            window_days,
            seed,
            synthetic_fallback,
            output,
        } => {
            let direction = Direction::from_str(&direction)
                .ok_or_else(|| anyhow!("Invalid direction: {direction}. Use long or short"))?;
            let start = parse_day_start(&start)?;
            let end = parse_day_start(&end)?;

            let signal = SignalSpec::new(symbol, timeframe, direction)
                .with_multiples(Decimal::try_from(stop_atr)?, Decimal::try_from(target_atr)?);
            let mut request = BacktestRequest::new(signal, start, end);
            request.initial_capital = Decimal::try_from(capital)?;
            request.risk_per_trade_pct = Decimal::try_from(risk)?;
            request.allow_synthetic_fallback = synthetic_fallback;
            request.monte_carlo.num_simulations = simulations;
            request.monte_carlo.seed = seed;
            request.walk_forward.in_sample_pct = in_sample_pct;
            request.walk_forward.window_days = window_days;
            request.synthetic.seed = seed;

            let orchestrator = BacktestOrchestrator::new(JsonBarFile::new(&bars));
            let report = orchestrator.run(&request).await?;
            report.print_summary();

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, json)?;
                info!("Report saved to {}", path);
            }
        }
        Commands::Montecarlo {
            pnls,
            capital,
            simulations,
            seed,
        } => {
            let raw = std::fs::read_to_string(&pnls)?;
            let values: Vec<f64> = serde_json::from_str(&raw)
                .map_err(|e| anyhow!("Invalid P&L file {pnls}: {e}"))?;
            let pnls: Vec<Decimal> = values
                .into_iter()
                .map(Decimal::try_from)
                .collect::<Result<_, _>>()?;

            let config = MonteCarloConfig {
                num_simulations: simulations,
                seed,
                ..Default::default()
            };
            let result =
                MonteCarloSimulator::new(config).run_on_pnls(&pnls, Decimal::try_from(capital)?);

            println!("\n=== Monte Carlo ({} runs) ===", result.num_simulations);
            println!("P5:   ${:.2}", result.percentile_5);
            println!("P25:  ${:.2}", result.percentile_25);
            println!("P50:  ${:.2}", result.percentile_50);
            println!("P75:  ${:.2}", result.percentile_75);
            println!("P95:  ${:.2}", result.percentile_95);
            println!("Mean: ${:.2} (std ${:.2})", result.mean_final_equity, result.std_final_equity);
            println!(
                "P(profit): {:.1}%   P(ruin): {:.1}%",
                result.probability_of_profit, result.probability_of_ruin
            );
        }
    }

    Ok(())
}

fn parse_day_start(s: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date format: {s}. Use YYYY-MM-DD"))?;
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(|| anyhow!("invalid time"))?;
    Ok(date.and_time(midnight).and_utc())
}
