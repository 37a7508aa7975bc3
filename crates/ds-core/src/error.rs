//! Error types for drawstat

use thiserror::Error;

/// drawstat error type
///
/// `Clone` so that a memoised task outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input rejected at the API boundary (never via a task).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The engine shut down before the task completed.
    #[error("Terminated")]
    Terminated,

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
