use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Trade;
use super::equity::{build_equity_curve, drawdown_stats};

/// Direction of the streak currently open at the end of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakType {
    Win,
    Loss,
    None,
}

/// Aggregate scalar report over a ledger. Purely derived; recomputed on
/// demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    // Counts
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate: Decimal,

    // Dollar P&L. `average_loss` and `largest_loss` keep the ledger sign
    // convention: non-positive values.
    pub total_pnl: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,

    // Ratios
    pub profit_factor: Decimal,
    pub expectancy: Decimal,
    pub sharpe_ratio: Decimal,
    pub sortino_ratio: Decimal,
    pub calmar_ratio: Decimal,
    pub recovery_factor: Decimal,

    // Drawdown
    pub max_drawdown: Decimal,
    pub max_drawdown_duration: u64,
    pub average_drawdown: Decimal,

    // Streaks
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
    pub current_streak: u32,
    pub current_streak_type: StreakType,

    // MAE/MFE
    pub average_mae: Decimal,
    pub average_mfe: Decimal,
    pub mae_mfe_ratio: Decimal,

    // R-multiples
    pub average_r_multiple: Decimal,
    pub median_r_multiple: Decimal,
    pub r_multiples: Vec<Decimal>,
}

struct Streaks {
    max_wins: u32,
    max_losses: u32,
    current: u32,
    current_type: StreakType,
}

/// Calculator for the advanced metrics report.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Every metric has a defined zero/neutral value for an empty ledger;
    /// no division-by-zero path exists.
    pub fn calculate(trades: &[Trade], initial_capital: Decimal) -> AdvancedMetrics {
        let total_trades = trades.len() as u64;
        let wins: Vec<&Trade> = trades.iter().filter(|t| t.net_pnl > Decimal::ZERO).collect();
        let losses: Vec<&Trade> = trades.iter().filter(|t| t.net_pnl <= Decimal::ZERO).collect();

        let winning_trades = wins.len() as u64;
        let losing_trades = losses.len() as u64;
        let win_rate = if total_trades > 0 {
            Decimal::from(winning_trades) / Decimal::from(total_trades) * dec!(100)
        } else {
            Decimal::ZERO
        };

        let total_pnl: Decimal = trades.iter().map(|t| t.net_pnl).sum();
        let gross_profit: Decimal = wins.iter().map(|t| t.net_pnl).sum();
        let gross_loss: Decimal = losses.iter().map(|t| t.net_pnl).sum();

        let average_win = if winning_trades > 0 {
            gross_profit / Decimal::from(winning_trades)
        } else {
            Decimal::ZERO
        };
        let average_loss = if losing_trades > 0 {
            gross_loss / Decimal::from(losing_trades)
        } else {
            Decimal::ZERO
        };
        let largest_win = wins.iter().map(|t| t.net_pnl).max().unwrap_or(Decimal::ZERO);
        let largest_loss = losses.iter().map(|t| t.net_pnl).min().unwrap_or(Decimal::ZERO);

        // Saturates to 0 with no losing trades rather than reporting infinity.
        let profit_factor = if gross_loss < Decimal::ZERO {
            gross_profit / gross_loss.abs()
        } else {
            Decimal::ZERO
        };

        let expectancy = average_win * win_rate / dec!(100)
            + average_loss * (Decimal::ONE - win_rate / dec!(100));

        // Per-trade returns normalized by starting capital.
        let returns: Vec<f64> = trades
            .iter()
            .map(|t| (t.net_pnl / initial_capital).to_f64().unwrap_or(0.0))
            .collect();
        let sharpe_ratio = to_decimal(sharpe(&returns));
        let sortino_ratio = to_decimal(sortino(&returns));

        let equity_curve = build_equity_curve(trades, initial_capital);
        let dd = drawdown_stats(&equity_curve);

        let capital_f64 = initial_capital.to_f64().unwrap_or(0.0);
        let total_pnl_f64 = total_pnl.to_f64().unwrap_or(0.0);

        // Trade-count-based annualization, a simplifying assumption: one
        // trade is treated as one day of exposure.
        let annual_return = if capital_f64 > 0.0 {
            total_pnl_f64 / capital_f64 * (365.0 / total_trades.max(1) as f64)
        } else {
            0.0
        };
        let calmar_ratio = if dd.max_drawdown_pct > 0.0 {
            to_decimal(annual_return / (dd.max_drawdown_pct / 100.0))
        } else {
            Decimal::ZERO
        };
        let recovery_factor = if dd.max_drawdown_pct > 0.0 && capital_f64 > 0.0 {
            to_decimal(total_pnl_f64 / (capital_f64 * dd.max_drawdown_pct / 100.0))
        } else {
            Decimal::ZERO
        };

        let streaks = calculate_streaks(trades);

        let average_mae = mean_decimal(trades.iter().map(|t| t.mae));
        let average_mfe = mean_decimal(trades.iter().map(|t| t.mfe));
        let mae_mfe_ratio = if average_mae.is_zero() {
            Decimal::ZERO
        } else {
            average_mfe / average_mae.abs()
        };

        let r_multiples: Vec<Decimal> = trades.iter().map(|t| t.r_multiple).collect();
        let average_r_multiple = mean_decimal(r_multiples.iter().copied());
        let median_r_multiple = median_decimal(&r_multiples);

        debug!(
            trades = total_trades,
            wins = winning_trades,
            losses = losing_trades,
            "Advanced metrics calculated"
        );

        AdvancedMetrics {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_pnl,
            average_win,
            average_loss,
            largest_win,
            largest_loss,
            profit_factor,
            expectancy,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            recovery_factor,
            max_drawdown: to_decimal(dd.max_drawdown_pct),
            max_drawdown_duration: dd.max_drawdown_duration,
            average_drawdown: to_decimal(dd.average_drawdown_pct),
            max_consecutive_wins: streaks.max_wins,
            max_consecutive_losses: streaks.max_losses,
            current_streak: streaks.current,
            current_streak_type: streaks.current_type,
            average_mae,
            average_mfe,
            mae_mfe_ratio,
            average_r_multiple,
            median_r_multiple,
            r_multiples,
        }
    }
}

fn sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev > 0.0 {
        mean / std_dev * 252.0f64.sqrt()
    } else {
        0.0
    }
}

// Denominator uses the negative returns only; 0 when there are none.
fn sortino(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let dn = downside.len() as f64;
    let downside_mean = downside.iter().sum::<f64>() / dn;
    let downside_variance =
        downside.iter().map(|r| (r - downside_mean).powi(2)).sum::<f64>() / dn;
    let downside_std = downside_variance.sqrt();
    if downside_std > 0.0 {
        mean / downside_std * 252.0f64.sqrt()
    } else {
        0.0
    }
}

fn calculate_streaks(trades: &[Trade]) -> Streaks {
    let mut max_wins = 0u32;
    let mut max_losses = 0u32;
    let mut current = 0u32;
    let mut current_type = StreakType::None;

    for trade in trades {
        let this_type = if trade.is_win() {
            StreakType::Win
        } else {
            StreakType::Loss
        };

        if this_type == current_type {
            current += 1;
        } else {
            current_type = this_type;
            current = 1;
        }

        match current_type {
            StreakType::Win => max_wins = max_wins.max(current),
            StreakType::Loss => max_losses = max_losses.max(current),
            StreakType::None => {}
        }
    }

    Streaks {
        max_wins,
        max_losses,
        current,
        current_type,
    }
}

fn mean_decimal(values: impl Iterator<Item = Decimal>) -> Decimal {
    let collected: Vec<Decimal> = values.collect();
    if collected.is_empty() {
        return Decimal::ZERO;
    }
    collected.iter().sum::<Decimal>() / Decimal::from(collected.len() as u64)
}

fn median_decimal(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / dec!(2)
    } else {
        sorted[n / 2]
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}
