use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::costs::TradeCosts;
use super::{Direction, TradingSession};

/// Why a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Neither level was touched within the scan window; exited at the close
    /// of the last scanned bar.
    WindowExpiry,
}

/// One simulated round trip. Never mutated after creation; owned by the
/// ledger that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub direction: Direction,
    pub quantity: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub net_pnl: Decimal,
    /// Net P&L relative to the entry price, expressed 0-100.
    pub pnl_pct: Decimal,
    pub costs: TradeCosts,
    pub exit_reason: ExitReason,
    pub weekday: Weekday,
    pub session: TradingSession,
    /// Simplified maximum adverse excursion: the stop distance when the stop
    /// was hit, 0 otherwise. Not a true intrabar extreme.
    pub mae: Decimal,
    /// Simplified maximum favorable excursion: the realized favorable move
    /// when the trade closed profitable, 0 otherwise.
    pub mfe: Decimal,
    /// Net P&L as a multiple of the initial risk distance.
    pub r_multiple: Decimal,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > Decimal::ZERO
    }
}
