use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::analysis::{
    MonteCarloConfig, MonteCarloResult, MonteCarloSimulator, RealityCheck, RealityCheckResult,
    RealityCheckThresholds, WalkForwardAnalyzer, WalkForwardConfig, WalkForwardReport,
};
use crate::costs::CostConfig;
use crate::data::BarSource;
use crate::error::ValidatorError;
use crate::types::{SignalSpec, Trade};

use super::equity::{build_equity_curve, EquityPoint};
use super::metrics::{AdvancedMetrics, MetricsCalculator};
use super::simulator::{SimulatorConfig, TradeSimulator};
use super::synthetic::{SyntheticLedger, SyntheticLedgerConfig};

/// Where the validated ledger came from. `Synthetic` results carry no
/// information about the market and must be labeled as such everywhere they
/// are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvenance {
    Historical,
    Synthetic,
}

/// Everything one validation run needs. Built by the caller; no globals.
#[derive(Debug, Clone)]
pub struct BacktestRequest {
    pub signal: SignalSpec,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: Decimal,
    pub risk_per_trade_pct: Decimal,
    /// When bars cannot be loaded, fall back to a synthetic ledger instead
    /// of failing. Off by default; opt-in only.
    pub allow_synthetic_fallback: bool,

    pub simulator: SimulatorConfig,
    pub costs: CostConfig,
    pub monte_carlo: MonteCarloConfig,
    pub walk_forward: WalkForwardConfig,
    pub reality: RealityCheckThresholds,
    pub synthetic: SyntheticLedgerConfig,
}

impl BacktestRequest {
    pub fn new(signal: SignalSpec, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            signal,
            start,
            end,
            initial_capital: dec!(10000),
            risk_per_trade_pct: dec!(2),
            allow_synthetic_fallback: false,
            simulator: SimulatorConfig::default(),
            costs: CostConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
            walk_forward: WalkForwardConfig::default(),
            reality: RealityCheckThresholds::default(),
            synthetic: SyntheticLedgerConfig::default(),
        }
    }
}

/// P&L aggregate for one session or weekday bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupStats {
    pub trades: u64,
    pub total_pnl: Decimal,
    pub win_rate: Decimal,
}

/// Full validation report. Serializable as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub provenance: DataProvenance,
    pub signal: SignalSpec,
    pub initial_capital: Decimal,
    pub total_trades: u64,

    pub advanced_metrics: AdvancedMetrics,
    pub walk_forward: WalkForwardReport,
    pub monte_carlo: MonteCarloResult,
    pub reality_check: RealityCheckResult,

    pub session_breakdown: BTreeMap<String, GroupStats>,
    pub weekday_breakdown: BTreeMap<String, GroupStats>,
    pub best_session: Option<String>,
    pub worst_session: Option<String>,
    pub best_weekday: Option<String>,
    pub worst_weekday: Option<String>,

    pub equity_curve: Vec<EquityPoint>,
    /// First trades of the ledger, capped so the report stays small.
    pub trades_sample: Vec<Trade>,
}

const TRADES_SAMPLE_LIMIT: usize = 50;

/// Runs the full validation pipeline: load bars, simulate, then metrics,
/// walk-forward, Monte Carlo and the reality check over the resulting
/// ledger.
pub struct BacktestOrchestrator<S: BarSource> {
    source: S,
}

impl<S: BarSource> BacktestOrchestrator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn run(&self, request: &BacktestRequest) -> Result<BacktestReport, ValidatorError> {
        if request.initial_capital <= Decimal::ZERO {
            return Err(ValidatorError::DegenerateInput(format!(
                "initial capital must be positive, got {}",
                request.initial_capital
            )));
        }
        if request.risk_per_trade_pct <= Decimal::ZERO || request.risk_per_trade_pct > dec!(100) {
            return Err(ValidatorError::DegenerateInput(format!(
                "risk per trade must be in (0, 100], got {}",
                request.risk_per_trade_pct
            )));
        }
        if request.end <= request.start {
            return Err(ValidatorError::DegenerateInput(
                "end must be after start".to_string(),
            ));
        }

        let simulator = TradeSimulator::new(request.simulator.clone(), request.costs.clone());

        let loaded = self
            .source
            .load_bars(
                &request.signal.symbol,
                &request.signal.timeframe,
                request.start,
                request.end,
            )
            .await;

        let (provenance, trades, walk_forward) = match loaded {
            Ok(bars) => {
                let trades = simulator.simulate(
                    &bars,
                    &request.signal,
                    request.initial_capital,
                    request.risk_per_trade_pct,
                )?;
                let walk_forward =
                    WalkForwardAnalyzer::new(&simulator, request.walk_forward.clone()).analyze(
                        &bars,
                        &request.signal,
                        request.initial_capital,
                        request.risk_per_trade_pct,
                    )?;
                (DataProvenance::Historical, trades, walk_forward)
            }
            Err(err @ ValidatorError::DataUnavailable(_)) => {
                if !request.allow_synthetic_fallback {
                    return Err(err);
                }
                warn!(
                    symbol = %request.signal.symbol,
                    error = %err,
                    "Historical bars unavailable; falling back to a synthetic ledger"
                );
                let trades = SyntheticLedger::new(request.synthetic.clone()).generate();
                // No bar history exists to partition.
                (DataProvenance::Synthetic, trades, WalkForwardReport::empty())
            }
            Err(err) => return Err(err),
        };

        let advanced_metrics = MetricsCalculator::calculate(&trades, request.initial_capital);
        let equity_curve = build_equity_curve(&trades, request.initial_capital);
        let monte_carlo = MonteCarloSimulator::new(request.monte_carlo.clone())
            .run(&trades, request.initial_capital);
        let reality_check = RealityCheck::new(request.reality.clone())
            .analyze(&advanced_metrics, advanced_metrics.total_trades);

        let session_breakdown = breakdown(&trades, |t| t.session.to_string());
        let weekday_breakdown = breakdown(&trades, |t| t.weekday.to_string());
        let (best_session, worst_session) = best_and_worst(&session_breakdown);
        let (best_weekday, worst_weekday) = best_and_worst(&weekday_breakdown);

        info!(
            symbol = %request.signal.symbol,
            provenance = ?provenance,
            trades = advanced_metrics.total_trades,
            grade = %reality_check.grade,
            "Backtest validation complete"
        );

        let trades_sample = trades.iter().take(TRADES_SAMPLE_LIMIT).cloned().collect();

        Ok(BacktestReport {
            provenance,
            signal: request.signal.clone(),
            initial_capital: request.initial_capital,
            total_trades: advanced_metrics.total_trades,
            advanced_metrics,
            walk_forward,
            monte_carlo,
            reality_check,
            session_breakdown,
            weekday_breakdown,
            best_session,
            worst_session,
            best_weekday,
            worst_weekday,
            equity_curve,
            trades_sample,
        })
    }
}

fn breakdown(trades: &[Trade], key: impl Fn(&Trade) -> String) -> BTreeMap<String, GroupStats> {
    let mut groups: BTreeMap<String, (u64, u64, Decimal)> = BTreeMap::new();
    for trade in trades {
        let entry = groups.entry(key(trade)).or_default();
        entry.0 += 1;
        if trade.is_win() {
            entry.1 += 1;
        }
        entry.2 += trade.net_pnl;
    }

    groups
        .into_iter()
        .map(|(name, (count, wins, total_pnl))| {
            let win_rate = if count > 0 {
                Decimal::from(wins) / Decimal::from(count) * dec!(100)
            } else {
                Decimal::ZERO
            };
            (
                name,
                GroupStats {
                    trades: count,
                    total_pnl,
                    win_rate,
                },
            )
        })
        .collect()
}

fn best_and_worst(groups: &BTreeMap<String, GroupStats>) -> (Option<String>, Option<String>) {
    let best = groups
        .iter()
        .max_by_key(|(_, s)| s.total_pnl)
        .map(|(name, _)| name.clone());
    let worst = groups
        .iter()
        .min_by_key(|(_, s)| s.total_pnl)
        .map(|(name, _)| name.clone());
    (best, worst)
}

impl BacktestReport {
    /// Human-readable console summary; the JSON report carries the detail.
    pub fn print_summary(&self) {
        println!("\n=== Backtest Validation Report ===");
        println!(
            "Signal:      {} {} ({})",
            self.signal.symbol, self.signal.direction, self.signal.timeframe
        );
        if self.provenance == DataProvenance::Synthetic {
            println!("Data:        SYNTHETIC (no historical bars; illustrative only)");
        } else {
            println!("Data:        historical");
        }
        println!("Trades:      {}", self.total_trades);

        let m = &self.advanced_metrics;
        println!("\n--- Performance ---");
        println!("Total P&L:     ${:.2}", m.total_pnl);
        println!("Win rate:      {:.1}%", m.win_rate);
        println!("Profit factor: {:.2}", m.profit_factor);
        println!("Expectancy:    ${:.2}", m.expectancy);
        println!("Sharpe:        {:.2}", m.sharpe_ratio);
        println!("Sortino:       {:.2}", m.sortino_ratio);
        println!("Calmar:        {:.2}", m.calmar_ratio);
        println!(
            "Max drawdown:  {:.2}% ({} trades)",
            m.max_drawdown, m.max_drawdown_duration
        );
        println!("Avg R:         {:.2}", m.average_r_multiple);

        println!("\n--- Monte Carlo ({} runs) ---", self.monte_carlo.num_simulations);
        println!("P5:   ${:.2}", self.monte_carlo.percentile_5);
        println!("P50:  ${:.2}", self.monte_carlo.percentile_50);
        println!("P95:  ${:.2}", self.monte_carlo.percentile_95);
        println!(
            "P(profit): {:.1}%   P(ruin): {:.1}%",
            self.monte_carlo.probability_of_profit, self.monte_carlo.probability_of_ruin
        );

        let wf = &self.walk_forward.summary;
        println!("\n--- Walk-Forward ---");
        if wf.total_periods == 0 {
            println!("{}", wf.message);
        } else {
            println!(
                "Periods: {}   Avg win-rate degradation: {:.2}%",
                wf.total_periods, wf.avg_win_rate_degradation
            );
            println!("{}", wf.message);
        }

        if let (Some(best), Some(worst)) = (&self.best_session, &self.worst_session) {
            println!("\n--- Sessions ---");
            println!("Best: {best}   Worst: {worst}");
        }
        if let (Some(best), Some(worst)) = (&self.best_weekday, &self.worst_weekday) {
            println!("Best weekday: {best}   Worst weekday: {worst}");
        }

        let rc = &self.reality_check;
        println!("\n--- Reality Check ---");
        println!(
            "Grade: {}   Confidence: {:.0}/100   Realistic: {}",
            rc.grade, rc.confidence_score, rc.is_realistic
        );
        for flag in &rc.red_flags {
            println!("RED FLAG: {flag}");
        }
        for warning in &rc.warnings {
            println!("Warning:  {warning}");
        }
        for suggestion in &rc.suggestions {
            println!("Suggest:  {suggestion}");
        }
        println!();
    }
}
