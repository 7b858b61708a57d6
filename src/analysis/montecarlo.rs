use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::Trade;

/// Caller-facing bounds on the simulation count.
pub const MIN_SIMULATIONS: usize = 1_000;
pub const MAX_SIMULATIONS: usize = 50_000;

/// How many full equity paths are retained for visualization; the remaining
/// simulations keep only their terminal value.
const SAMPLE_CURVE_LIMIT: usize = 100;

/// Configuration for the bootstrap resampling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub num_simulations: usize,
    /// Informational only; does not change the algorithm.
    pub confidence_level: f64,
    /// Half-width of the uniform multiplicative variance applied to each
    /// resampled P&L (0.10 = factors in [0.9, 1.1]). 0 disables.
    pub variance_pct: f64,
    /// Probability that a resampled trade is zeroed out, modeling a fill
    /// that never happened. 0 disables.
    pub failure_probability: f64,
    /// Explicit seed for reproducible runs; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            confidence_level: 95.0,
            variance_pct: 0.10,
            failure_probability: 0.05,
            seed: None,
        }
    }
}

/// Terminal-equity distribution summary across all simulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub num_simulations: usize,
    pub confidence_level: f64,

    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_50: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,

    pub mean_final_equity: f64,
    pub std_final_equity: f64,
    pub min_final_equity: f64,
    pub max_final_equity: f64,

    /// Fraction of simulations ending above initial capital, 0-100.
    pub probability_of_profit: f64,
    /// Fraction of simulations ending below half the initial capital, 0-100.
    pub probability_of_ruin: f64,

    pub sample_curves: Vec<Vec<f64>>,
}

/// Bootstrap-resamples the ledger's P&L values to produce a distribution of
/// plausible terminal equities.
///
/// Resampling with replacement deliberately breaks temporal ordering; this
/// is a distribution stress test, not a sequence-preserving simulation.
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, trades: &[Trade], initial_capital: Decimal) -> MonteCarloResult {
        let pnls: Vec<Decimal> = trades.iter().map(|t| t.net_pnl).collect();
        self.run_on_pnls(&pnls, initial_capital)
    }

    pub fn run_on_pnls(&self, pnls: &[Decimal], initial_capital: Decimal) -> MonteCarloResult {
        let num_simulations = self
            .config
            .num_simulations
            .clamp(MIN_SIMULATIONS, MAX_SIMULATIONS);
        let capital = initial_capital.to_f64().unwrap_or(0.0);
        // Convert once; the inner loop stays in f64.
        let pnls: Vec<f64> = pnls.iter().map(|p| p.to_f64().unwrap_or(0.0)).collect();

        info!(
            simulations = num_simulations,
            trades = pnls.len(),
            seeded = self.config.seed.is_some(),
            "Running Monte Carlo resampling"
        );

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut final_equities = Vec::with_capacity(num_simulations);
        let mut sample_curves = Vec::with_capacity(SAMPLE_CURVE_LIMIT);

        for sim in 0..num_simulations {
            let keep_curve = sim < SAMPLE_CURVE_LIMIT;
            let mut equity = capital;
            let mut curve = if keep_curve {
                let mut c = Vec::with_capacity(pnls.len() + 1);
                c.push(equity);
                c
            } else {
                Vec::new()
            };

            for _ in 0..pnls.len() {
                let mut pnl = pnls[rng.gen_range(0..pnls.len())];
                if self.config.variance_pct > 0.0 {
                    let factor = rng.gen_range(1.0 - self.config.variance_pct..1.0 + self.config.variance_pct);
                    pnl *= factor;
                }
                if self.config.failure_probability > 0.0
                    && rng.gen::<f64>() < self.config.failure_probability
                {
                    pnl = 0.0;
                }
                equity += pnl;
                if keep_curve {
                    curve.push(equity);
                }
            }

            final_equities.push(equity);
            if keep_curve {
                sample_curves.push(curve);
            }

            if (sim + 1) % 5_000 == 0 {
                debug!(completed = sim + 1, "Monte Carlo progress");
            }
        }

        summarize(
            &mut final_equities,
            capital,
            num_simulations,
            self.config.confidence_level,
            sample_curves,
        )
    }
}

fn summarize(
    final_equities: &mut [f64],
    capital: f64,
    num_simulations: usize,
    confidence_level: f64,
    sample_curves: Vec<Vec<f64>>,
) -> MonteCarloResult {
    let n = final_equities.len() as f64;
    let mean = final_equities.iter().sum::<f64>() / n;
    let variance = final_equities.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;

    let profitable = final_equities.iter().filter(|&&e| e > capital).count();
    let ruined = final_equities.iter().filter(|&&e| e < capital * 0.5).count();

    final_equities.sort_by(|a, b| a.partial_cmp(b).expect("terminal equity is finite"));

    MonteCarloResult {
        num_simulations,
        confidence_level,
        percentile_5: percentile(final_equities, 5.0),
        percentile_25: percentile(final_equities, 25.0),
        percentile_50: percentile(final_equities, 50.0),
        percentile_75: percentile(final_equities, 75.0),
        percentile_95: percentile(final_equities, 95.0),
        mean_final_equity: mean,
        std_final_equity: variance.sqrt(),
        min_final_equity: final_equities.first().copied().unwrap_or(0.0),
        max_final_equity: final_equities.last().copied().unwrap_or(0.0),
        probability_of_profit: profitable as f64 / n * 100.0,
        probability_of_ruin: ruined as f64 / n * 100.0,
        sample_curves,
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        let weight = rank - low as f64;
        sorted[low] * (1.0 - weight) + sorted[high] * weight
    }
}
