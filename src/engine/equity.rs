use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::Trade;

/// Point on the running-equity curve. One per ledger entry plus a synthetic
/// starting point with no timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub equity: Decimal,
    pub peak: Decimal,
    pub drawdown: Decimal,
    pub drawdown_pct: Decimal,
}

/// Drawdown aggregates over an equity curve. Durations are in trade count,
/// not wall time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawdownStats {
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: u64,
    pub average_drawdown_pct: f64,
}

/// Walks the ledger accumulating equity from `initial_capital`, tracking the
/// running peak and drawdown per point.
pub fn build_equity_curve(trades: &[Trade], initial_capital: Decimal) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    let mut equity = initial_capital;
    let mut peak = initial_capital;

    curve.push(EquityPoint {
        timestamp: None,
        equity,
        peak,
        drawdown: Decimal::ZERO,
        drawdown_pct: Decimal::ZERO,
    });

    for trade in trades {
        equity += trade.net_pnl;
        if equity > peak {
            peak = equity;
        }
        let drawdown = peak - equity;
        let drawdown_pct = if peak > Decimal::ZERO {
            drawdown / peak * Decimal::from(100)
        } else {
            Decimal::ZERO
        };

        curve.push(EquityPoint {
            timestamp: Some(trade.entry_time),
            equity,
            peak,
            drawdown,
            drawdown_pct,
        });
    }

    curve
}

/// Largest peak-to-trough percentage drop, the longest run of points without
/// a new peak, and the mean drawdown while underwater.
pub fn drawdown_stats(curve: &[EquityPoint]) -> DrawdownStats {
    if curve.is_empty() {
        return DrawdownStats::default();
    }

    let mut peak = curve[0].equity;
    let mut max_dd = 0.0f64;
    let mut max_duration = 0u64;
    let mut current_duration = 0u64;
    let mut underwater: Vec<f64> = Vec::new();

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
            current_duration = 0;
        } else {
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
            let dd = if peak > Decimal::ZERO {
                ((peak - point.equity) / peak * Decimal::from(100))
                    .to_f64()
                    .unwrap_or(0.0)
            } else {
                0.0
            };
            underwater.push(dd);
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    let average = if underwater.is_empty() {
        0.0
    } else {
        underwater.iter().sum::<f64>() / underwater.len() as f64
    };

    DrawdownStats {
        max_drawdown_pct: max_dd,
        max_drawdown_duration: max_duration,
        average_drawdown_pct: average,
    }
}
