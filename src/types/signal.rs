use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction for a backtested signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Describes the signal under validation. Supplied once per run; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSpec {
    pub symbol: String,
    pub timeframe: String,
    pub direction: Direction,
    /// Stop-loss distance as a multiple of the 14-period ATR.
    pub stop_atr_multiple: Decimal,
    /// Take-profit distance as a multiple of the 14-period ATR.
    pub target_atr_multiple: Decimal,
}

impl SignalSpec {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>, direction: Direction) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            direction,
            stop_atr_multiple: dec!(2.0),
            target_atr_multiple: dec!(3.0),
        }
    }

    pub fn with_multiples(mut self, stop: Decimal, target: Decimal) -> Self {
        self.stop_atr_multiple = stop;
        self.target_atr_multiple = target;
        self
    }
}

/// Trading session bucket derived from the entry hour (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingSession {
    Asia,
    London,
    NewYork,
}

impl TradingSession {
    /// [0,8) Asia, [8,13) London, [13,22) New York, [22,24) Asia.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            8..=12 => TradingSession::London,
            13..=21 => TradingSession::NewYork,
            _ => TradingSession::Asia,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingSession::Asia => "Asia",
            TradingSession::London => "London",
            TradingSession::NewYork => "New York",
        }
    }
}

impl fmt::Display for TradingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_boundaries() {
        assert_eq!(TradingSession::from_hour(0), TradingSession::Asia);
        assert_eq!(TradingSession::from_hour(7), TradingSession::Asia);
        assert_eq!(TradingSession::from_hour(8), TradingSession::London);
        assert_eq!(TradingSession::from_hour(12), TradingSession::London);
        assert_eq!(TradingSession::from_hour(13), TradingSession::NewYork);
        assert_eq!(TradingSession::from_hour(21), TradingSession::NewYork);
        assert_eq!(TradingSession::from_hour(22), TradingSession::Asia);
        assert_eq!(TradingSession::from_hour(23), TradingSession::Asia);
    }

    #[test]
    fn test_signal_defaults() {
        let spec = SignalSpec::new("BTC/USDT", "1h", Direction::Long);
        assert_eq!(spec.stop_atr_multiple, dec!(2.0));
        assert_eq!(spec.target_atr_multiple, dec!(3.0));
    }

    #[test]
    fn test_signal_multiples_override() {
        let spec = SignalSpec::new("BTC/USDT", "1h", Direction::Long)
            .with_multiples(dec!(1.5), dec!(4));
        assert_eq!(spec.stop_atr_multiple, dec!(1.5));
        assert_eq!(spec.target_atr_multiple, dec!(4));
    }
}
