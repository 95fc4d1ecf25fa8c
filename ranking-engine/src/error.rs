//! Error types for the ranking engine

use thiserror::Error;

/// Ranking engine error
///
/// Scoring itself is total over well-formed input; only configuration
/// can be rejected.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid scoring configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
