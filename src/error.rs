use thiserror::Error;

/// Errors surfaced by the validation engine.
///
/// Insufficient history is deliberately NOT an error: the simulator returns
/// an empty ledger and every downstream stage produces neutral values for it.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Caller contract violation (zero capital, out-of-range risk, zero-width
    /// stop). Fails fast instead of silently producing infinite position size.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The upstream bar provider could not deliver data.
    #[error("historical data unavailable: {0}")]
    DataUnavailable(String),

    /// Bar timestamps must be strictly increasing.
    #[error("bar series not strictly ordered at index {0}")]
    UnorderedBars(usize),
}
