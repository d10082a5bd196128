use noesis_graph::LookupError;
use thiserror::Error;

/// Errors surfaced by the reasoning engines.
///
/// Not-found and budget-exhaustion outcomes are reported through result
/// values; only these cases abort a call.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// The graph store failed or returned malformed data.
    #[error("graph lookup failed: {0}")]
    Lookup(#[from] LookupError),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A hypothesis worker panicked or was cancelled.
    #[error("hypothesis worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for ReasoningError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
