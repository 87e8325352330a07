//!
//! Vertebra: observable records, reconciled record sets and fragment routing.
//! This library provides the client-side data layer for building event-driven applications.
//!
//! ## Core Concepts
//!
//! Vertebra is built around a few small pieces that all speak the same event protocol:
//!
//! * **Notifiers (`events::Notifier`)**: The publish/subscribe capability. Every entity below embeds one and exposes it through the `events::Observable` trait.
//! * **Records (`record::Record`)**: Observable attribute maps with change tracking, validation and a client id. All writes go through `Record::set`, which emits at most one terminal `"change"` per batch even when handlers write back.
//! * **Record sets (`record_set::RecordSet`)**: Ordered, indexed groups of records. `RecordSet::set` reconciles membership against new input (add, merge, remove, sort) and re-emits member events.
//! * **Transports (`sync::Transport`)**: The injected capability that performs remote reads and writes. `sync::MemoryTransport` resolves requests in-process.
//! * **Routing (`router::Router`, `router::History`)**: Fragment-to-callback dispatch over an abstract browser location.
//! * **Views (`view::View`)**: Event delegation through an abstract element host.
//!
//! Everything is single-threaded: handles are `Rc`-based and cheap to clone.

pub mod constants;
pub mod events;
pub mod record;
pub mod record_set;
pub mod router;
pub mod sync;
pub mod value;
pub mod view;

pub use events::{Callback, Notifier, Observable};
pub use record::{
    DestroyOptions, FetchOptions, Record, RecordConfig, RecordEvent, SaveOptions, SetOptions,
    ValidationError,
};
pub use record_set::{
    AddOptions, Comparator, Input, Lookup, ReconcileOptions, RecordSet, RemoveOptions,
    ResetOptions, SetConfig, SetError, SetEvent, SetFetchOptions, SortOptions,
};
pub use router::{
    History, HistoryOptions, Location, MemoryLocation, NavigateOptions, Observation, RouteEvent,
    RoutePattern, Router, RouterError,
};
pub use sync::{
    HttpRequest, MemoryTransport, SyncConfig, SyncError, SyncOptions, SyncTarget, Transport,
    TransportError, Verb,
};
pub use value::{Attributes, Changes, Value};
pub use view::{ElementHost, View};

/// Result type used throughout the Vertebra library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Vertebra library.
///
/// Only usage errors and serialization failures travel through `Err`. Failed
/// validations and transport failures are reported as events on the affected
/// record or set (and as `Ok(false)` from the call that started them).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A rejected attribute write
    #[error(transparent)]
    Validation(record::ValidationError),

    /// Structured record set errors from the record_set module
    #[error(transparent)]
    Set(record_set::SetError),

    /// Structured sync errors from the sync module
    #[error(transparent)]
    Sync(sync::SyncError),

    /// Structured routing errors from the router module
    #[error(transparent)]
    Router(router::RouterError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Serialize(_) => "serialize",
            Error::Validation(_) => "record",
            Error::Set(_) => "record_set",
            Error::Sync(_) => "sync",
            Error::Router(_) => "router",
        }
    }

    /// Check if this error is a misuse of the API rather than a data condition.
    pub fn is_usage_error(&self) -> bool {
        match self {
            Error::Set(set_err) => set_err.is_usage_error(),
            Error::Sync(sync_err) => sync_err.is_usage_error(),
            Error::Router(router_err) => router_err.is_usage_error(),
            _ => false,
        }
    }

    /// Check if this error came back from a transport.
    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::Sync(sync_err) => sync_err.is_transport_error(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if this error is routing-related.
    pub fn is_router_error(&self) -> bool {
        matches!(self, Error::Router(_))
    }
}
