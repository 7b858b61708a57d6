use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Friction percentages applied to simulated fills.
///
/// Constructed by the caller and passed into the simulator; there is no
/// process-wide default instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Maker commission (% of notional). Carried for completeness; the
    /// simulator models taker fills only.
    pub maker_fee_pct: Decimal,
    /// Taker commission (% of notional), charged on entry and exit.
    pub taker_fee_pct: Decimal,
    /// Average slippage (% of notional), charged on entry and exit.
    pub avg_slippage_pct: Decimal,
    /// Average half-spread (% of notional). Modeling choice: the spread is
    /// charged on entry only, exits are assumed to cross at the quoted level.
    pub avg_spread_pct: Decimal,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            maker_fee_pct: dec!(0.10),
            taker_fee_pct: dec!(0.15),
            avg_slippage_pct: dec!(0.05),
            avg_spread_pct: dec!(0.02),
        }
    }
}

/// Realized frictions and P&L for one round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeCosts {
    pub entry_cost: Decimal,
    pub exit_cost: Decimal,
    pub total_cost: Decimal,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    /// `total_cost / |gross_pnl| * 100`, 0 when gross P&L is 0.
    pub cost_impact_pct: Decimal,
}

impl TradeCosts {
    pub fn zero() -> Self {
        Self {
            entry_cost: Decimal::ZERO,
            exit_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            gross_pnl: Decimal::ZERO,
            net_pnl: Decimal::ZERO,
            cost_impact_pct: Decimal::ZERO,
        }
    }
}

impl CostConfig {
    /// Pure arithmetic: entry cost = commission + slippage + spread,
    /// exit cost = commission + slippage, net P&L = gross - total.
    pub fn trade_costs(
        &self,
        entry_price: Decimal,
        exit_price: Decimal,
        quantity: Decimal,
        direction: Direction,
    ) -> TradeCosts {
        let pct = dec!(100);

        let entry_notional = entry_price * quantity;
        let entry_commission = entry_notional * (self.taker_fee_pct / pct);
        let entry_slippage = entry_notional * (self.avg_slippage_pct / pct);
        let entry_spread = entry_notional * (self.avg_spread_pct / pct);
        let entry_cost = entry_commission + entry_slippage + entry_spread;

        let exit_notional = exit_price * quantity;
        let exit_commission = exit_notional * (self.taker_fee_pct / pct);
        let exit_slippage = exit_notional * (self.avg_slippage_pct / pct);
        let exit_cost = exit_commission + exit_slippage;

        let gross_pnl = match direction {
            Direction::Long => (exit_price - entry_price) * quantity,
            Direction::Short => (entry_price - exit_price) * quantity,
        };

        let total_cost = entry_cost + exit_cost;
        let net_pnl = gross_pnl - total_cost;
        let cost_impact_pct = if gross_pnl.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / gross_pnl.abs() * pct
        };

        TradeCosts {
            entry_cost,
            exit_cost,
            total_cost,
            gross_pnl,
            net_pnl,
            cost_impact_pct,
        }
    }
}
