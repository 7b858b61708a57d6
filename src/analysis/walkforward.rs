use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{MetricsCalculator, TradeSimulator};
use crate::error::ValidatorError;
use crate::types::{BarSeries, SignalSpec};

/// Rolling-window partition settings.
#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    /// Share of each window used for in-sample simulation, 0-100.
    pub in_sample_pct: f64,
    /// Length of one rolling window in days.
    pub window_days: i64,
    /// The strategy is flagged consistent while the average win-rate
    /// degradation stays below this. Policy default, not derived from data;
    /// callers with product input should override.
    pub max_avg_win_rate_degradation: Decimal,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            in_sample_pct: 70.0,
            window_days: 30,
            max_avg_win_rate_degradation: Decimal::from(30),
        }
    }
}

/// Metrics for one rolling in-sample/out-of-sample split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardPeriod {
    pub period_number: usize,
    pub in_sample_start: DateTime<Utc>,
    pub in_sample_end: DateTime<Utc>,
    pub out_sample_start: DateTime<Utc>,
    pub out_sample_end: DateTime<Utc>,

    pub in_sample_trades: u64,
    pub in_sample_win_rate: Decimal,
    pub in_sample_pnl: Decimal,
    pub in_sample_sharpe: Decimal,

    pub out_sample_trades: u64,
    pub out_sample_win_rate: Decimal,
    pub out_sample_pnl: Decimal,
    pub out_sample_sharpe: Decimal,

    /// `(in_sample - out_sample) / in_sample * 100`; positive means the
    /// out-of-sample result is worse.
    pub win_rate_degradation: Decimal,
    pub sharpe_degradation: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub total_periods: usize,
    pub avg_win_rate_degradation: Decimal,
    pub avg_sharpe_degradation: Decimal,
    pub total_out_sample_trades: u64,
    pub consistent: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub periods: Vec<WalkForwardPeriod>,
    pub summary: WalkForwardSummary,
}

impl WalkForwardReport {
    /// Report for a run with no usable windows (too little history, or a
    /// synthetic ledger with no bar data behind it).
    pub fn empty() -> Self {
        Self {
            periods: Vec::new(),
            summary: WalkForwardSummary {
                total_periods: 0,
                avg_win_rate_degradation: Decimal::ZERO,
                avg_sharpe_degradation: Decimal::ZERO,
                total_out_sample_trades: 0,
                consistent: true,
                message: "No walk-forward windows evaluated".to_string(),
            },
        }
    }
}

/// Relative degradation of an out-of-sample value against its in-sample
/// counterpart, 0 when the in-sample value is 0.
pub fn degradation(in_sample: Decimal, out_sample: Decimal) -> Decimal {
    if in_sample.is_zero() {
        Decimal::ZERO
    } else {
        (in_sample - out_sample) / in_sample * Decimal::from(100)
    }
}

/// Splits history into rolling windows and re-runs the simulator and the
/// metrics calculator on each in-sample/out-of-sample slice.
pub struct WalkForwardAnalyzer<'a> {
    simulator: &'a TradeSimulator,
    config: WalkForwardConfig,
}

impl<'a> WalkForwardAnalyzer<'a> {
    pub fn new(simulator: &'a TradeSimulator, config: WalkForwardConfig) -> Self {
        Self { simulator, config }
    }

    pub fn analyze(
        &self,
        bars: &BarSeries,
        signal: &SignalSpec,
        initial_capital: Decimal,
        risk_per_trade_pct: Decimal,
    ) -> Result<WalkForwardReport, ValidatorError> {
        if self.config.window_days <= 0 {
            return Err(ValidatorError::DegenerateInput(format!(
                "walk-forward window must be at least 1 day, got {}",
                self.config.window_days
            )));
        }
        if self.config.in_sample_pct <= 0.0 || self.config.in_sample_pct >= 100.0 {
            return Err(ValidatorError::DegenerateInput(format!(
                "in-sample share must be in (0, 100), got {}",
                self.config.in_sample_pct
            )));
        }

        let (start, end) = match (bars.first_timestamp(), bars.last_timestamp()) {
            (Some(s), Some(e)) => (s, e),
            _ => return Ok(WalkForwardReport::empty()),
        };

        let window = Duration::days(self.config.window_days);
        let in_sample_days =
            (self.config.window_days as f64 * self.config.in_sample_pct / 100.0).floor() as i64;
        let in_sample_len = Duration::days(in_sample_days);

        let mut periods = Vec::new();
        let mut window_start = start;
        // Only complete windows are evaluated; a trailing partial window is
        // dropped.
        while window_start + window <= end {
            let is_end = window_start + in_sample_len;
            let oos_end = window_start + window;

            let period = self.evaluate_window(
                bars,
                signal,
                initial_capital,
                risk_per_trade_pct,
                periods.len() + 1,
                window_start,
                is_end,
                oos_end,
            )?;
            debug!(
                period = period.period_number,
                is_trades = period.in_sample_trades,
                oos_trades = period.out_sample_trades,
                "Walk-forward window evaluated"
            );
            periods.push(period);
            window_start = oos_end;
        }

        let summary = self.summarize(&periods);
        info!(
            periods = summary.total_periods,
            consistent = summary.consistent,
            "Walk-forward analysis complete"
        );

        Ok(WalkForwardReport { periods, summary })
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_window(
        &self,
        bars: &BarSeries,
        signal: &SignalSpec,
        initial_capital: Decimal,
        risk_per_trade_pct: Decimal,
        period_number: usize,
        window_start: DateTime<Utc>,
        is_end: DateTime<Utc>,
        oos_end: DateTime<Utc>,
    ) -> Result<WalkForwardPeriod, ValidatorError> {
        let is_bars = bars.between(window_start, is_end);
        let oos_bars = bars.between(is_end, oos_end);

        let is_trades =
            self.simulator
                .simulate(&is_bars, signal, initial_capital, risk_per_trade_pct)?;
        let oos_trades =
            self.simulator
                .simulate(&oos_bars, signal, initial_capital, risk_per_trade_pct)?;

        let is_metrics = MetricsCalculator::calculate(&is_trades, initial_capital);
        let oos_metrics = MetricsCalculator::calculate(&oos_trades, initial_capital);

        Ok(WalkForwardPeriod {
            period_number,
            in_sample_start: window_start,
            in_sample_end: is_end,
            out_sample_start: is_end,
            out_sample_end: oos_end,
            in_sample_trades: is_metrics.total_trades,
            in_sample_win_rate: is_metrics.win_rate,
            in_sample_pnl: is_metrics.total_pnl,
            in_sample_sharpe: is_metrics.sharpe_ratio,
            out_sample_trades: oos_metrics.total_trades,
            out_sample_win_rate: oos_metrics.win_rate,
            out_sample_pnl: oos_metrics.total_pnl,
            out_sample_sharpe: oos_metrics.sharpe_ratio,
            win_rate_degradation: degradation(is_metrics.win_rate, oos_metrics.win_rate),
            sharpe_degradation: degradation(is_metrics.sharpe_ratio, oos_metrics.sharpe_ratio),
        })
    }

    fn summarize(&self, periods: &[WalkForwardPeriod]) -> WalkForwardSummary {
        if periods.is_empty() {
            return WalkForwardReport::empty().summary;
        }

        let n = Decimal::from(periods.len() as u64);
        let avg_win_rate_degradation =
            periods.iter().map(|p| p.win_rate_degradation).sum::<Decimal>() / n;
        let avg_sharpe_degradation =
            periods.iter().map(|p| p.sharpe_degradation).sum::<Decimal>() / n;
        let total_out_sample_trades = periods.iter().map(|p| p.out_sample_trades).sum();

        let consistent = avg_win_rate_degradation < self.config.max_avg_win_rate_degradation;
        let message = if consistent {
            format!(
                "Strategy consistent: average win-rate degradation {:.2}% below {:.2}% threshold",
                avg_win_rate_degradation, self.config.max_avg_win_rate_degradation
            )
        } else {
            format!(
                "Strategy degrades out-of-sample: average win-rate degradation {:.2}% exceeds {:.2}% threshold",
                avg_win_rate_degradation, self.config.max_avg_win_rate_degradation
            )
        };

        WalkForwardSummary {
            total_periods: periods.len(),
            avg_win_rate_degradation,
            avg_sharpe_degradation,
            total_out_sample_trades,
            consistent,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costs::CostConfig;
    use crate::engine::SimulatorConfig;
    use crate::types::{Bar, Direction};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_degradation_reference_value() {
        // In-sample 70%, out-of-sample 50% => (70-50)/70*100 = 28.57...
        let value = degradation(dec!(70), dec!(50));
        assert_eq!(value.round_dp(2), dec!(28.57));
    }

    #[test]
    fn test_degradation_zero_guard() {
        assert_eq!(degradation(Decimal::ZERO, dec!(50)), Decimal::ZERO);
    }

    #[test]
    fn test_degradation_negative_when_oos_improves() {
        assert!(degradation(dec!(50), dec!(70)) < Decimal::ZERO);
    }

    fn hourly_series(days: i64) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..days * 24)
            .map(|i| {
                let close = Decimal::from(100 + (i % 5));
                Bar {
                    timestamp: start + Duration::hours(i),
                    open: close,
                    high: close + dec!(1),
                    low: close - dec!(1),
                    close,
                    volume: dec!(10),
                }
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    #[test]
    fn test_complete_windows_only() {
        let simulator = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let analyzer = WalkForwardAnalyzer::new(&simulator, WalkForwardConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        // 75 days of hourly bars with 30-day windows: two complete windows,
        // the 15-day tail is dropped.
        let report = analyzer
            .analyze(&hourly_series(75), &signal, dec!(10000), dec!(2))
            .unwrap();
        assert_eq!(report.summary.total_periods, 2);
        assert_eq!(report.periods.len(), 2);

        let first = &report.periods[0];
        assert_eq!(first.period_number, 1);
        // 70% of 30 days in-sample.
        assert_eq!(first.in_sample_end - first.in_sample_start, Duration::days(21));
        assert_eq!(first.out_sample_end - first.out_sample_start, Duration::days(9));
        // Windows tile the range without gaps.
        assert_eq!(report.periods[1].in_sample_start, first.out_sample_end);
    }

    #[test]
    fn test_zero_window_days_fails_fast() {
        let simulator = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);
        let bars = hourly_series(40);

        // A zero-length window would never advance past the range start.
        let config = WalkForwardConfig {
            window_days: 0,
            ..Default::default()
        };
        let result = WalkForwardAnalyzer::new(&simulator, config).analyze(
            &bars,
            &signal,
            dec!(10000),
            dec!(2),
        );
        assert!(matches!(result, Err(ValidatorError::DegenerateInput(_))));
    }

    #[test]
    fn test_out_of_range_in_sample_pct_fails_fast() {
        let simulator = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);
        let bars = hourly_series(40);

        for pct in [0.0, 100.0, 120.0, -5.0] {
            let config = WalkForwardConfig {
                in_sample_pct: pct,
                ..Default::default()
            };
            let result = WalkForwardAnalyzer::new(&simulator, config).analyze(
                &bars,
                &signal,
                dec!(10000),
                dec!(2),
            );
            assert!(
                matches!(result, Err(ValidatorError::DegenerateInput(_))),
                "in_sample_pct {pct} should be rejected"
            );
        }
    }

    #[test]
    fn test_short_history_yields_empty_report() {
        let simulator = TradeSimulator::new(SimulatorConfig::default(), CostConfig::default());
        let analyzer = WalkForwardAnalyzer::new(&simulator, WalkForwardConfig::default());
        let signal = SignalSpec::new("BTC/USDT", "1h", Direction::Long);

        let report = analyzer
            .analyze(&hourly_series(10), &signal, dec!(10000), dec!(2))
            .unwrap();
        assert!(report.periods.is_empty());
        assert!(report.summary.consistent);
        assert_eq!(report.summary.total_out_sample_trades, 0);
    }
}
