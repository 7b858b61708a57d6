use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::info;

use crate::error::ValidatorError;
use crate::types::{Bar, BarSeries};

/// Source of historical candles. The orchestrator is generic over this so
/// tests can inject fixed series and production can plug in exchange or
/// database backends.
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn load_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, ValidatorError>;
}

/// Reads candles from a JSON file containing an array of bars.
pub struct JsonBarFile {
    path: PathBuf,
}

impl JsonBarFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BarSource for JsonBarFile {
    async fn load_bars(
        &self,
        symbol: &str,
        _timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, ValidatorError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ValidatorError::DataUnavailable(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))
        })?;
        let bars: Vec<Bar> = serde_json::from_str(&raw).map_err(|e| {
            ValidatorError::DataUnavailable(format!(
                "cannot parse {}: {e}",
                self.path.display()
            ))
        })?;

        let series = BarSeries::new(bars)?;
        let series = series.between(start, end);
        if series.is_empty() {
            return Err(ValidatorError::DataUnavailable(format!(
                "no bars for {symbol} in the requested range"
            )));
        }

        info!(
            symbol,
            bars = series.len(),
            path = %self.path.display(),
            "Loaded historical bars"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_missing_file_is_data_unavailable() {
        let source = JsonBarFile::new("/nonexistent/bars.json");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let err = source
            .load_bars("BTC/USDT", "1h", start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidatorError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_parses_bar_array() {
        let dir = std::env::temp_dir().join("backtest_validator_test_bars");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bars.json");
        std::fs::write(
            &path,
            r#"[
                {"timestamp":"2024-01-01T00:00:00Z","open":"100","high":"101","low":"99","close":"100.5","volume":"10"},
                {"timestamp":"2024-01-01T01:00:00Z","open":"100.5","high":"102","low":"100","close":"101","volume":"12"}
            ]"#,
        )
        .unwrap();

        let source = JsonBarFile::new(&path);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let series = source.load_bars("BTC/USDT", "1h", start, end).await.unwrap();
        assert_eq!(series.len(), 2);
    }
}
