use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;
use uuid::Uuid;

use crate::costs::TradeCosts;
use crate::types::{Direction, ExitReason, Trade, TradingSession};

/// Parameters for the fallback ledger generator.
#[derive(Debug, Clone)]
pub struct SyntheticLedgerConfig {
    pub count: usize,
    /// Mean of the normal P&L distribution, in account currency.
    pub mean_pnl: f64,
    /// Standard deviation of the normal P&L distribution.
    pub std_pnl: f64,
    pub seed: Option<u64>,
}

impl Default for SyntheticLedgerConfig {
    fn default() -> Self {
        Self {
            count: 200,
            mean_pnl: 50.0,
            std_pnl: 100.0,
            seed: None,
        }
    }
}

/// Generates a plausible ledger when no historical bars are available.
///
/// Output is clearly artificial: P&L values are drawn from a normal
/// distribution, entries are spaced evenly in time, and costs are zero.
/// Callers must surface the synthetic provenance to the user.
pub struct SyntheticLedger {
    config: SyntheticLedgerConfig,
}

impl SyntheticLedger {
    pub fn new(config: SyntheticLedgerConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self) -> Vec<Trade> {
        warn!(
            count = self.config.count,
            "Generating synthetic trade ledger; results do not reflect market data"
        );

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        // Fixed risk distance so r-multiples stay on the same scale as the
        // P&L distribution.
        let risk = Decimal::from(self.config.std_pnl.max(1.0) as i64);
        let entry_price = dec!(100);

        (0..self.config.count)
            .map(|i| {
                let pnl = normal_sample(&mut rng, self.config.mean_pnl, self.config.std_pnl);
                let net_pnl = Decimal::try_from(pnl).unwrap_or(Decimal::ZERO).round_dp(2);
                // Stagger entries across hours of the day so session and
                // weekday breakdowns stay populated.
                let entry_time = start + Duration::hours(i as i64 * 7);
                self.build_trade(entry_time, entry_price, risk, net_pnl)
            })
            .collect()
    }

    fn build_trade(
        &self,
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        risk: Decimal,
        net_pnl: Decimal,
    ) -> Trade {
        let won = net_pnl > Decimal::ZERO;
        Trade {
            id: Uuid::new_v4().to_string(),
            entry_time,
            entry_price,
            exit_price: entry_price + net_pnl / risk,
            direction: Direction::Long,
            quantity: risk,
            stop_loss: entry_price - Decimal::ONE,
            take_profit: entry_price + dec!(1.5),
            net_pnl,
            pnl_pct: net_pnl / risk,
            costs: TradeCosts {
                gross_pnl: net_pnl,
                net_pnl,
                ..TradeCosts::zero()
            },
            exit_reason: if won {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            },
            weekday: entry_time.weekday(),
            session: TradingSession::from_hour(entry_time.hour()),
            mae: net_pnl.min(Decimal::ZERO),
            mfe: net_pnl.max(Decimal::ZERO),
            r_multiple: net_pnl / risk,
        }
    }
}

/// One draw from N(mean, std) via the Box-Muller transform.
fn normal_sample(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    // 1 - gen keeps the argument of ln strictly positive.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}
