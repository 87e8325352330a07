//! Validation errors reported by record validators.

use thiserror::Error;

/// Rejection returned by a record's validator.
///
/// A rejected `set` leaves the record untouched and stores the error, which is
/// then available through [`Record::validation_error`](crate::Record::validation_error)
/// and carried by the `"invalid"` event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", match attribute { Some(a) => format!("{a}: {message}"), None => message.clone() })]
pub struct ValidationError {
    /// Description of the rejection
    pub message: String,
    /// The attribute at fault, when the validator names one
    pub attribute: Option<String>,
}

impl ValidationError {
    /// A rejection of the record as a whole.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attribute: None,
        }
    }

    /// A rejection pinned to one attribute.
    pub fn on(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attribute: Some(attribute.into()),
        }
    }
}

impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        crate::Error::Validation(err)
    }
}
