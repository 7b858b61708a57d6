use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::engine::AdvancedMetrics;

/// "Too good to be true" cutoffs. Constructed by the caller; no process-wide
/// instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealityCheckThresholds {
    pub sharpe_suspicious: f64,
    pub sharpe_extreme: f64,
    pub calmar_suspicious: f64,
    pub sortino_suspicious: f64,
    pub profit_factor_extreme: f64,
    pub max_dd_too_low: f64,
    pub win_rate_too_high: f64,
    pub r_multiple_min: f64,
    /// Minimum trade count before a low drawdown is treated as suspicious.
    pub low_dd_min_trades: u64,
}

impl Default for RealityCheckThresholds {
    fn default() -> Self {
        Self {
            sharpe_suspicious: 5.0,
            sharpe_extreme: 3.0,
            calmar_suspicious: 10.0,
            sortino_suspicious: 10.0,
            profit_factor_extreme: 5.0,
            max_dd_too_low: 3.0,
            win_rate_too_high: 75.0,
            r_multiple_min: 1.0,
            low_dd_min_trades: 50,
        }
    }
}

/// Letter grade over the final confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 75.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{letter}")
    }
}

/// Outcome of the heuristic overfitting audit. Same inputs always produce
/// the same outputs; there is no randomness or hidden state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealityCheckResult {
    pub is_realistic: bool,
    /// 0-100; starts at 100 and each tripped rule deducts.
    pub confidence_score: f64,
    pub warnings: Vec<String>,
    pub red_flags: Vec<String>,
    pub suggestions: Vec<String>,
    pub grade: Grade,
}

/// Applies the fixed rule set to one metrics report.
pub struct RealityCheck {
    thresholds: RealityCheckThresholds,
}

impl RealityCheck {
    pub fn new(thresholds: RealityCheckThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, metrics: &AdvancedMetrics, num_trades: u64) -> RealityCheckResult {
        let t = &self.thresholds;
        let mut warnings = Vec::new();
        let mut red_flags = Vec::new();
        let mut suggestions = Vec::new();
        let mut score = 100.0f64;

        let sharpe = metrics.sharpe_ratio.to_f64().unwrap_or(0.0);
        let calmar = metrics.calmar_ratio.to_f64().unwrap_or(0.0);
        let sortino = metrics.sortino_ratio.to_f64().unwrap_or(0.0);
        let profit_factor = metrics.profit_factor.to_f64().unwrap_or(0.0);
        let max_dd = metrics.max_drawdown.to_f64().unwrap_or(0.0);
        let win_rate = metrics.win_rate.to_f64().unwrap_or(0.0);
        let r_multiple = metrics.average_r_multiple.to_f64().unwrap_or(0.0);
        let total_pnl = metrics.total_pnl.to_f64().unwrap_or(0.0);

        if sharpe > t.sharpe_suspicious {
            red_flags.push(format!(
                "Sharpe ratio {sharpe:.2} is extremely high (>{:.0}). Values like this are \
                 nearly impossible in live trading; probable overfitting or noise-free data.",
                t.sharpe_suspicious
            ));
            score -= 30.0;
        } else if sharpe > t.sharpe_extreme {
            warnings.push(format!(
                "Sharpe ratio {sharpe:.2} is exceptional (>{:.0}). Verify cost and slippage \
                 realism.",
                t.sharpe_extreme
            ));
            score -= 10.0;
        }

        if calmar > t.calmar_suspicious {
            red_flags.push(format!(
                "Calmar ratio {calmar:.2} is unrealistically high (>{:.0}), suggesting an \
                 artificially low drawdown or a cherry-picked period.",
                t.calmar_suspicious
            ));
            score -= 20.0;
        }

        if num_trades > t.low_dd_min_trades && max_dd < t.max_dd_too_low {
            red_flags.push(format!(
                "Max drawdown {max_dd:.2}% is suspiciously low for {num_trades} trades; \
                 volatile markets normally produce 5-15%.",
            ));
            score -= 25.0;
            suggestions.push("Run walk-forward analysis across multiple periods".to_string());
            suggestions
                .push("Stress the cost model: slippage 0.1-0.2%, commission 0.1%".to_string());
        }

        if win_rate > t.win_rate_too_high {
            warnings.push(format!(
                "Win rate {win_rate:.1}% is very high (>{:.0}%) and hard to sustain live.",
                t.win_rate_too_high
            ));
            score -= 15.0;
        }

        // The key scalability check: winning by volume instead of edge.
        if r_multiple < t.r_multiple_min {
            red_flags.push(format!(
                "Average R-multiple {r_multiple:.2} is below {:.1}: the edge does not scale. \
                 Larger position sizes will be eaten by costs.",
                t.r_multiple_min
            ));
            score -= 20.0;
            suggestions.push("Optimize entries until the average R-multiple exceeds 1.5".to_string());
            suggestions.push("Add filters to keep only higher-quality setups".to_string());
        }

        if profit_factor > t.profit_factor_extreme {
            warnings.push(format!(
                "Profit factor {profit_factor:.2} is extremely high (>{:.0}); rare in \
                 sustainable strategies.",
                t.profit_factor_extreme
            ));
            score -= 10.0;
        }

        if sortino > t.sortino_suspicious {
            warnings.push(format!(
                "Sortino ratio {sortino:.2} is suspiciously high (>{:.0}); losses may be \
                 unrealistically controlled.",
                t.sortino_suspicious
            ));
            score -= 10.0;
        }

        if red_flags.len() >= 3 {
            suggestions.push(
                "Multiple red flags: high probability of overfitting".to_string(),
            );
            suggestions.push("Walk-forward analysis is mandatory before going live".to_string());
            suggestions.push("Re-test on fully out-of-sample data".to_string());
        }

        // A losing system cannot be graded realistic regardless of its other
        // metrics.
        if total_pnl < 0.0 {
            red_flags.push(format!(
                "Total P&L is negative (${total_pnl:.2}): losing system."
            ));
            suggestions.push("Do not trade this system until it is reworked".to_string());
            score = 0.0;
        }

        if red_flags.is_empty() && warnings.is_empty() {
            suggestions.push("Metrics are within acceptable ranges".to_string());
            suggestions.push("Still run walk-forward analysis to validate robustness".to_string());
        }

        let score = score.max(0.0);
        let grade = Grade::from_score(score);
        let is_realistic = score > 60.0 && red_flags.len() < 2;

        debug!(
            score,
            %grade,
            warnings = warnings.len(),
            red_flags = red_flags.len(),
            "Reality check complete"
        );

        RealityCheckResult {
            is_realistic,
            confidence_score: score,
            warnings,
            red_flags,
            suggestions,
            grade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn healthy_metrics() -> AdvancedMetrics {
        AdvancedMetrics {
            total_trades: 100,
            winning_trades: 55,
            losing_trades: 45,
            win_rate: dec!(55),
            total_pnl: dec!(2500),
            average_win: dec!(120),
            average_loss: dec!(-80),
            largest_win: dec!(400),
            largest_loss: dec!(-300),
            profit_factor: dec!(1.8),
            expectancy: dec!(30),
            sharpe_ratio: dec!(1.4),
            sortino_ratio: dec!(2.1),
            calmar_ratio: dec!(2.5),
            recovery_factor: dec!(3.0),
            max_drawdown: dec!(12),
            max_drawdown_duration: 8,
            average_drawdown: dec!(4),
            max_consecutive_wins: 6,
            max_consecutive_losses: 4,
            current_streak: 2,
            current_streak_type: crate::engine::StreakType::Win,
            average_mae: dec!(-40),
            average_mfe: dec!(90),
            mae_mfe_ratio: dec!(2.25),
            average_r_multiple: dec!(1.5),
            median_r_multiple: dec!(1.2),
            r_multiples: vec![],
        }
    }

    fn check() -> RealityCheck {
        RealityCheck::new(RealityCheckThresholds::default())
    }

    #[test]
    fn test_healthy_metrics_grade_a() {
        let result = check().analyze(&healthy_metrics(), 100);
        assert_eq!(result.confidence_score, 100.0);
        assert_eq!(result.grade, Grade::A);
        assert!(result.is_realistic);
        assert!(result.warnings.is_empty());
        assert!(result.red_flags.is_empty());
        // Clean runs still get the confirmatory suggestions.
        assert_eq!(result.suggestions.len(), 2);
    }

    #[test]
    fn test_losing_system_forces_zero_score() {
        let mut metrics = healthy_metrics();
        metrics.total_pnl = dec!(-500);
        let result = check().analyze(&metrics, 100);

        assert_eq!(result.confidence_score, 0.0);
        assert_eq!(result.grade, Grade::F);
        assert!(!result.is_realistic);
        assert!(!result.red_flags.is_empty());
    }

    #[test]
    fn test_sharpe_six_is_red_flag() {
        let mut metrics = healthy_metrics();
        metrics.sharpe_ratio = dec!(6.0);
        let result = check().analyze(&metrics, 100);

        assert_eq!(result.red_flags.len(), 1);
        assert_eq!(result.confidence_score, 70.0);
    }

    #[test]
    fn test_sharpe_two_triggers_nothing() {
        let mut metrics = healthy_metrics();
        metrics.sharpe_ratio = dec!(2.0);
        let result = check().analyze(&metrics, 100);

        assert!(result.warnings.is_empty());
        assert!(result.red_flags.is_empty());
        assert_eq!(result.confidence_score, 100.0);
    }

    #[test]
    fn test_sharpe_four_is_warning_only() {
        let mut metrics = healthy_metrics();
        metrics.sharpe_ratio = dec!(4.0);
        let result = check().analyze(&metrics, 100);

        assert_eq!(result.warnings.len(), 1);
        assert!(result.red_flags.is_empty());
        assert_eq!(result.confidence_score, 90.0);
    }

    #[test]
    fn test_low_drawdown_rule_needs_trade_count() {
        let mut metrics = healthy_metrics();
        metrics.max_drawdown = dec!(1.5);

        // 40 trades: too few for the rule to apply.
        let result = check().analyze(&metrics, 40);
        assert!(result.red_flags.is_empty());

        let result = check().analyze(&metrics, 100);
        assert_eq!(result.red_flags.len(), 1);
        assert_eq!(result.confidence_score, 75.0);
        assert_eq!(result.suggestions.len(), 2);
    }

    #[test]
    fn test_unscalable_r_multiple_is_red_flag() {
        let mut metrics = healthy_metrics();
        metrics.average_r_multiple = dec!(0.4);
        let result = check().analyze(&metrics, 100);

        assert_eq!(result.red_flags.len(), 1);
        assert_eq!(result.confidence_score, 80.0);
        assert!(result.suggestions.iter().any(|s| s.contains("R-multiple")));
    }

    #[test]
    fn test_three_red_flags_adds_overfitting_block() {
        let mut metrics = healthy_metrics();
        metrics.sharpe_ratio = dec!(6.0);
        metrics.calmar_ratio = dec!(12.0);
        metrics.average_r_multiple = dec!(0.5);
        let result = check().analyze(&metrics, 100);

        assert_eq!(result.red_flags.len(), 3);
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("overfitting")));
        // 100 - 30 - 20 - 20 = 30.
        assert_eq!(result.confidence_score, 30.0);
        assert_eq!(result.grade, Grade::F);
        assert!(!result.is_realistic);
    }

    #[test]
    fn test_is_realistic_requires_score_and_flag_count() {
        let mut metrics = healthy_metrics();
        // One red flag, score 70: still realistic.
        metrics.sharpe_ratio = dec!(6.0);
        let result = check().analyze(&metrics, 100);
        assert!(result.is_realistic);

        // Second red flag pushes it over.
        metrics.calmar_ratio = dec!(12.0);
        let result = check().analyze(&metrics, 100);
        assert_eq!(result.red_flags.len(), 2);
        assert!(!result.is_realistic);
    }

    #[test]
    fn test_grade_ladder() {
        assert_eq!(Grade::from_score(95.0), Grade::A);
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(75.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(40.0), Grade::D);
        assert_eq!(Grade::from_score(39.9), Grade::F);
    }

    #[test]
    fn test_same_inputs_same_outputs() {
        let metrics = healthy_metrics();
        let a = check().analyze(&metrics, 100);
        let b = check().analyze(&metrics, 100);
        assert_eq!(a.confidence_score, b.confidence_score);
        assert_eq!(a.warnings, b.warnings);
        assert_eq!(a.red_flags, b.red_flags);
    }
}
