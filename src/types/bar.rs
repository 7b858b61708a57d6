use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;

/// One OHLCV sample. Immutable once loaded into a [`BarSeries`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Ordered, validated sequence of bars with strictly increasing timestamps.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, ValidatorError> {
        for i in 1..bars.len() {
            if bars[i].timestamp <= bars[i - 1].timestamp {
                return Err(ValidatorError::UnorderedBars(i));
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Bars with `start <= timestamp < end`. Ordering is preserved, so the
    /// result is a valid series by construction.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BarSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp < end)
            .cloned()
            .collect();
        BarSeries { bars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(hour: u32) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(10),
        }
    }

    #[test]
    fn test_rejects_unordered_bars() {
        let result = BarSeries::new(vec![bar(2), bar(1)]);
        assert!(matches!(result, Err(ValidatorError::UnorderedBars(1))));
    }

    #[test]
    fn test_between_is_half_open() {
        let series = BarSeries::new(vec![bar(0), bar(1), bar(2), bar(3)]).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let slice = series.between(start, end);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.first_timestamp(), Some(start));
    }
}
