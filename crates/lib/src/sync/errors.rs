//! Error types for the transport boundary.
//!
//! Two kinds of failure meet here. [`SyncError`] covers problems detected
//! before anything is sent (no URL, no transport configured). These are usage
//! errors and propagate to the caller immediately. [`TransportError`] is the
//! payload of an asynchronous failure; it is delivered to error callbacks and
//! `"error"` events and never returned from `fetch`/`save`/`destroy`.

use thiserror::Error;

/// Failure reported by a transport for a request it attempted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("transport failure{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct TransportError {
    /// Status code reported by the remote end, if any
    pub status: Option<u16>,
    /// Human-readable description
    pub message: String,
    /// Decoded response body, if the remote end sent one
    pub body: Option<serde_json::Value>,
}

impl TransportError {
    /// Creates a failure without status or body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Creates a failure carrying a status code.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body: None,
        }
    }

    /// Attaches a decoded response body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Structured error types for the sync boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SyncError {
    /// Neither the target nor the call supplied a URL
    #[error("A URL must be specified for {target}")]
    MissingUrl { target: String },

    /// No transport is configured for the target
    #[error("No transport configured for {target}")]
    NoTransport { target: String },

    /// Unknown verb name
    #[error("Unknown sync verb: {verb}")]
    UnknownVerb { verb: String },

    /// The transport refused the request synchronously
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// Check if this error is a configuration/usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SyncError::MissingUrl { .. } | SyncError::NoTransport { .. } | SyncError::UnknownVerb { .. }
        )
    }

    /// Check if this error came from the transport itself
    pub fn is_transport_error(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    /// Get the target description if this error names one
    pub fn target(&self) -> Option<&str> {
        match self {
            SyncError::MissingUrl { target } | SyncError::NoTransport { target } => Some(target),
            _ => None,
        }
    }
}

impl From<SyncError> for crate::Error {
    fn from(err: SyncError) -> Self {
        crate::Error::Sync(err)
    }
}

impl From<TransportError> for crate::Error {
    fn from(err: TransportError) -> Self {
        crate::Error::Sync(SyncError::Transport(err))
    }
}
