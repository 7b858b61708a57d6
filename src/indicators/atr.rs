use rust_decimal::Decimal;

use crate::types::Bar;
use super::Indicator;

/// Average True Range as a rolling mean of the true range over `period` bars.
///
/// The first bar's true range falls back to high-low since there is no
/// previous close.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<Decimal>,
    true_ranges: Vec<Decimal>,
    value: Option<Decimal>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            true_ranges: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let tr = self.true_range(high, low);
        self.prev_close = Some(close);

        self.true_ranges.push(tr);
        if self.true_ranges.len() > self.period {
            self.true_ranges.remove(0);
        }

        if self.true_ranges.len() < self.period {
            self.value = None;
            return None;
        }

        let sum: Decimal = self.true_ranges.iter().sum();
        self.value = Some(sum / Decimal::from(self.period as u32));
        self.value
    }

    fn true_range(&self, high: Decimal, low: Decimal) -> Decimal {
        let hl = high - low;
        match self.prev_close {
            Some(prev_close) => {
                let hc = (high - prev_close).abs();
                let lc = (low - prev_close).abs();
                hl.max(hc).max(lc)
            }
            None => hl,
        }
    }

    /// ATR value aligned with each bar index; `None` during warm-up.
    pub fn series(bars: &[Bar], period: usize) -> Vec<Option<Decimal>> {
        let mut atr = Atr::new(period);
        bars.iter()
            .map(|b| atr.update(b.high, b.low, b.close))
            .collect()
    }
}

impl Indicator for Atr {
    fn name(&self) -> &'static str {
        "ATR"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.true_ranges.clear();
        self.value = None;
    }
}
