use chrono::{Datelike, Timelike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::costs::CostConfig;
use crate::error::ValidatorError;
use crate::indicators::Atr;
use crate::types::{Bar, BarSeries, Direction, ExitReason, SignalSpec, Trade, TradingSession};

/// Tunables for the bar-walking simulation.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// ATR warm-up length in bars.
    pub atr_period: usize,
    /// Entry sampling density: one candidate entry every N bars. Keeps the
    /// loop bounded and avoids pathological position overlap.
    pub entry_stride: usize,
    /// Maximum bars to scan forward for a stop/target touch.
    pub scan_window: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            entry_stride: 10,
            scan_window: 50,
        }
    }
}

/// Walks a bar series opening volatility-sized positions and emits the
/// closed-trade ledger. One position at a time; entries never overlap.
pub struct TradeSimulator {
    config: SimulatorConfig,
    costs: CostConfig,
}

impl TradeSimulator {
    pub fn new(config: SimulatorConfig, costs: CostConfig) -> Self {
        Self { config, costs }
    }

    /// Simulate the signal over `bars`. Returns an empty ledger when the
    /// series is shorter than the ATR warm-up; that is a valid,
    /// uninformative outcome, not an error. Degenerate sizing inputs fail
    /// fast instead.
    pub fn simulate(
        &self,
        bars: &BarSeries,
        signal: &SignalSpec,
        initial_capital: Decimal,
        risk_per_trade_pct: Decimal,
    ) -> Result<Vec<Trade>, ValidatorError> {
        if initial_capital <= Decimal::ZERO {
            return Err(ValidatorError::DegenerateInput(format!(
                "initial capital must be positive, got {initial_capital}"
            )));
        }
        if risk_per_trade_pct <= Decimal::ZERO || risk_per_trade_pct > dec!(100) {
            return Err(ValidatorError::DegenerateInput(format!(
                "risk per trade must be in (0, 100], got {risk_per_trade_pct}"
            )));
        }
        // A zero stride would never advance the entry loop.
        if self.config.entry_stride == 0 {
            return Err(ValidatorError::DegenerateInput(
                "entry stride must be at least 1".to_string(),
            ));
        }

        let bars = bars.bars();
        if bars.len() <= self.config.atr_period {
            debug!(
                bars = bars.len(),
                warm_up = self.config.atr_period,
                "Not enough bars for ATR warm-up, returning empty ledger"
            );
            return Ok(Vec::new());
        }

        let atr_series = Atr::series(bars, self.config.atr_period);
        let risk_amount = initial_capital * risk_per_trade_pct / dec!(100);
        let mut trades = Vec::new();

        let mut i = self.config.atr_period;
        while i < bars.len() {
            if let Some(trade) = self.simulate_entry(bars, &atr_series, i, signal, risk_amount) {
                trades.push(trade);
            }
            i += self.config.entry_stride;
        }

        info!(
            symbol = %signal.symbol,
            direction = %signal.direction,
            trades = trades.len(),
            "Trade simulation complete"
        );

        Ok(trades)
    }

    fn simulate_entry(
        &self,
        bars: &[Bar],
        atr_series: &[Option<Decimal>],
        index: usize,
        signal: &SignalSpec,
        risk_amount: Decimal,
    ) -> Option<Trade> {
        let atr = atr_series[index]?;
        if atr <= Decimal::ZERO {
            // Flat window: no measurable volatility to size against.
            debug!(index, "Skipping entry with zero ATR");
            return None;
        }

        let entry_bar = &bars[index];
        let entry_price = entry_bar.close;
        let direction = signal.direction;

        let stop_distance = atr * signal.stop_atr_multiple;
        let target_distance = atr * signal.target_atr_multiple;
        let (stop_loss, take_profit) = match direction {
            Direction::Long => (entry_price - stop_distance, entry_price + target_distance),
            Direction::Short => (entry_price + stop_distance, entry_price - target_distance),
        };

        let scan_end = (index + 1 + self.config.scan_window).min(bars.len());
        let scan = &bars[index + 1..scan_end];
        if scan.is_empty() {
            return None;
        }

        // First touch wins; within one bar the stop is checked first.
        let mut exit_price = entry_price;
        let mut exit_reason = ExitReason::WindowExpiry;
        for bar in scan {
            let (hit_stop, hit_target) = match direction {
                Direction::Long => (bar.low <= stop_loss, bar.high >= take_profit),
                Direction::Short => (bar.high >= stop_loss, bar.low <= take_profit),
            };
            if hit_stop {
                exit_price = stop_loss;
                exit_reason = ExitReason::StopLoss;
                break;
            }
            if hit_target {
                exit_price = take_profit;
                exit_reason = ExitReason::TakeProfit;
                break;
            }
        }
        if exit_reason == ExitReason::WindowExpiry {
            exit_price = scan[scan.len() - 1].close;
        }

        // Sized so a stop hit loses exactly the configured risk amount
        // before frictions. `stop_distance > 0` holds because ATR > 0.
        let quantity = position_size(risk_amount, entry_price, stop_loss).ok()?;
        let costs = self
            .costs
            .trade_costs(entry_price, exit_price, quantity, direction);
        let net_pnl = costs.net_pnl;
        let pnl_pct = net_pnl / entry_price * dec!(100);

        // Approximated excursions from the touched levels, not true intrabar
        // extremes.
        let hit_stop = exit_reason == ExitReason::StopLoss;
        let mae = match (direction, hit_stop) {
            (Direction::Long, true) => stop_loss - entry_price,
            (Direction::Short, true) => entry_price - stop_loss,
            (_, false) => Decimal::ZERO,
        };
        let mfe = if net_pnl > Decimal::ZERO {
            match direction {
                Direction::Long => exit_price - entry_price,
                Direction::Short => entry_price - exit_price,
            }
        } else {
            Decimal::ZERO
        };

        let r_multiple = net_pnl / stop_distance;

        Some(Trade {
            id: Uuid::new_v4().to_string(),
            entry_time: entry_bar.timestamp,
            entry_price,
            exit_price,
            direction,
            quantity,
            stop_loss,
            take_profit,
            net_pnl,
            pnl_pct,
            costs,
            exit_reason,
            weekday: entry_bar.timestamp.weekday(),
            session: TradingSession::from_hour(entry_bar.timestamp.hour()),
            mae,
            mfe,
            r_multiple,
        })
    }
}

/// Position size such that a stop-loss hit costs exactly `risk_amount`
/// before frictions. Fails fast on a zero-width stop.
pub fn position_size(
    risk_amount: Decimal,
    entry_price: Decimal,
    stop_price: Decimal,
) -> Result<Decimal, ValidatorError> {
    let stop_distance = (entry_price - stop_price).abs();
    if stop_distance.is_zero() {
        return Err(ValidatorError::DegenerateInput(
            "stop distance is zero, position size would be infinite".to_string(),
        ));
    }
    Ok(risk_amount / stop_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn series(closes: &[f64], start: DateTime<chrono::Utc>) -> BarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let close = Decimal::try_from(c).unwrap();
                Bar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close,
                    high: close + dec!(1),
                    low: close - dec!(1),
                    close,
                    volume: dec!(100),
                }
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    fn flat_series(len: usize) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        series(&vec![100.0; len], start)
    }

    #[test]
    fn test_position_size_reference_values() {
        // capital 10000 at 2% risk => risk amount 200; entry 100, stop 95
        // => 200 / 5 = 40 units.
        let risk_amount = dec!(10000) * dec!(2) / dec!(100);
        let size = position_size(risk_amount, dec!(100), dec!(95)).unwrap();
        assert_eq!(size, dec!(40));
    }

    #[test]
    fn test_position_size_rejects_zero_stop_distance() {
        let result = position_size(dec!(200), dec!(100), dec!(100));
        assert!(matches!(result, Err(ValidatorError::DegenerateInput(_))));
    }

    #[test]
    fn test_insufficient_bars_returns_empty_ledger() {
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);
        let trades = sim
            .simulate(&flat_series(10), &signal, dec!(10000), dec!(2))
            .unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn test_degenerate_inputs_fail_fast() {
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);
        let bars = flat_series(100);

        assert!(sim.simulate(&bars, &signal, Decimal::ZERO, dec!(2)).is_err());
        assert!(sim.simulate(&bars, &signal, dec!(10000), Decimal::ZERO).is_err());
        assert!(sim.simulate(&bars, &signal, dec!(10000), dec!(101)).is_err());
    }

    #[test]
    fn test_zero_entry_stride_fails_fast() {
        let config = SimulatorConfig {
            entry_stride: 0,
            ..Default::default()
        };
        let sim = TradeSimulator::new(config, CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        let result = sim.simulate(&flat_series(100), &signal, dec!(10000), dec!(2));
        assert!(matches!(result, Err(ValidatorError::DegenerateInput(_))));
    }

    #[test]
    fn test_ledger_is_chronological_and_non_overlapping_entries() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i % 7) as f64).collect();
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        let trades = sim
            .simulate(&series(&closes, start), &signal, dec!(10000), dec!(2))
            .unwrap();
        assert!(!trades.is_empty());
        for pair in trades.windows(2) {
            assert!(pair[0].entry_time < pair[1].entry_time);
        }
    }

    #[test]
    fn test_stop_hit_records_mae_and_stop_exit() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // Stable warm-up, then a collapse right after the first sampled entry.
        let mut closes: Vec<f64> = vec![100.0; 15];
        closes.extend(vec![40.0; 20]);
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        let trades = sim
            .simulate(&series(&closes, start), &signal, dec!(10000), dec!(2))
            .unwrap();
        let first = &trades[0];
        assert_eq!(first.exit_reason, ExitReason::StopLoss);
        assert_eq!(first.exit_price, first.stop_loss);
        assert_eq!(first.mae, first.stop_loss - first.entry_price);
        assert!(first.mae < Decimal::ZERO);
        assert!(first.r_multiple < Decimal::ZERO);
    }

    #[test]
    fn test_short_direction_profits_from_collapse() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut closes: Vec<f64> = vec![100.0; 15];
        closes.extend(vec![40.0; 20]);
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Short);

        let trades = sim
            .simulate(&series(&closes, start), &signal, dec!(10000), dec!(2))
            .unwrap();
        let first = &trades[0];
        assert_eq!(first.exit_reason, ExitReason::TakeProfit);
        assert!(first.net_pnl > Decimal::ZERO);
        assert!(first.mfe > Decimal::ZERO);
    }

    #[test]
    fn test_custom_atr_multiples_set_levels() {
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long)
            .with_multiples(dec!(1), dec!(2));

        // Flat series keeps ATR at 2 (high minus low).
        let trades = sim
            .simulate(&flat_series(40), &signal, dec!(10000), dec!(2))
            .unwrap();
        assert_eq!(trades[0].stop_loss, dec!(98));
        assert_eq!(trades[0].take_profit, dec!(104));
    }

    #[test]
    fn test_window_expiry_exits_at_last_scanned_close() {
        // Constant closes: ATR stays 2 (high-low), no level is ever touched.
        let bars = flat_series(40);
        let sim = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        let trades = sim.simulate(&bars, &signal, dec!(10000), dec!(2)).unwrap();
        assert!(!trades.is_empty());
        assert_eq!(trades[0].exit_reason, ExitReason::WindowExpiry);
        assert_eq!(trades[0].exit_price, dec!(100));
    }
}
