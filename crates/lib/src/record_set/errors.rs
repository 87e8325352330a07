//! Error types for record set operations.

use thiserror::Error;

/// Structured error types for record set operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    /// An ordering operation was requested on a set without a comparator
    #[error("Cannot sort set '{set}' without a comparator")]
    NoComparator { set: String },
}

impl SetError {
    /// Check if this error is a configuration/usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(self, SetError::NoComparator { .. })
    }

    /// Name of the set involved
    pub fn set_name(&self) -> &str {
        match self {
            SetError::NoComparator { set } => set,
        }
    }
}

impl From<SetError> for crate::Error {
    fn from(err: SetError) -> Self {
        crate::Error::Set(err)
    }
}
