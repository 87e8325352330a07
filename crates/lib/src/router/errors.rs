//! Error types for routing.

use thiserror::Error;

/// Structured error types for routing and history operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// `start` was called on a history that is already running
    #[error("History has already been started")]
    AlreadyStarted,

    /// A route pattern did not compile
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RouterError {
    /// Check if this error is a configuration/usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            RouterError::AlreadyStarted | RouterError::InvalidPattern { .. }
        )
    }
}

impl From<RouterError> for crate::Error {
    fn from(err: RouterError) -> Self {
        crate::Error::Router(err)
    }
}
