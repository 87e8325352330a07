//! The transport boundary.
//!
//! Records and record sets never perform I/O themselves. They call an injected
//! [`Transport`] with one of five [`Verb`]s and a [`SyncOptions`] carrying the
//! URL, an optional attribute payload and the two outcome callbacks. The
//! transport invokes exactly one of them, at whatever later point suits its
//! host. The core wraps every error callback so that an `"error"` event is
//! emitted on the originating record or set whether or not the caller
//! supplied a handler.
//!
//! [`HttpRequest::build`] maps a call onto an HTTP request description
//! (including the legacy-server emulation modes), and [`MemoryTransport`] is
//! an in-process transport that queues requests until they are answered.

use std::{fmt, rc::Rc, str::FromStr};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::{Record, RecordSet, Result, value::Attributes};

pub mod errors;
pub mod memory;
pub mod request;

pub use errors::{SyncError, TransportError};
pub use memory::{MemoryTransport, PendingSync};
pub use request::{HttpRequest, Method, RequestBody};

/// Characters left unescaped when a single path component is encoded.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Remote operation requested from a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Update,
    Patch,
    Delete,
    Read,
}

impl Verb {
    /// HTTP method the verb maps to.
    pub fn method(self) -> Method {
        match self {
            Verb::Create => Method::Post,
            Verb::Update => Method::Put,
            Verb::Patch => Method::Patch,
            Verb::Delete => Method::Delete,
            Verb::Read => Method::Get,
        }
    }

    /// Whether requests for this verb carry the target's attributes.
    pub fn sends_body(self) -> bool {
        matches!(self, Verb::Create | Verb::Update | Verb::Patch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Read => "read",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Verb::Create),
            "update" => Ok(Verb::Update),
            "patch" => Ok(Verb::Patch),
            "delete" => Ok(Verb::Delete),
            "read" => Ok(Verb::Read),
            _ => Err(SyncError::UnknownVerb { verb: s.to_string() }),
        }
    }
}

/// Accommodations for servers that only understand GET/POST or form bodies.
///
/// Both modes are off by default and can be toggled independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Send PUT/PATCH/DELETE as POST with the real method in an override header
    pub emulate_http: bool,
    /// Send the JSON payload inside a single form field
    pub emulate_json: bool,
}

/// The entity a sync call operates on.
#[derive(Debug, Clone)]
pub enum SyncTarget {
    Record(Record),
    Set(RecordSet),
}

impl SyncTarget {
    /// URL of the target's remote resource.
    pub fn url(&self) -> Result<String> {
        match self {
            SyncTarget::Record(record) => record.url(),
            SyncTarget::Set(set) => set.url(),
        }
    }

    /// Wire representation of the target's current state.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SyncTarget::Record(record) => record.to_json(),
            SyncTarget::Set(set) => set.to_json(),
        }
    }

    /// Short description used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            SyncTarget::Record(record) => format!("record {}", record.cid()),
            SyncTarget::Set(set) => format!("set {}", set.config().name()),
        }
    }
}

/// Callback receiving a successful response payload.
pub type SuccessFn = Box<dyn FnOnce(serde_json::Value)>;

/// Callback receiving a transport failure.
pub type ErrorFn = Box<dyn FnOnce(TransportError)>;

/// Per-call request details and outcome channels handed to a [`Transport`].
#[derive(Default)]
pub struct SyncOptions {
    /// Explicit URL, overriding the target's own
    pub url: Option<String>,
    /// Payload to send instead of the target's full state
    pub attrs: Option<Attributes>,
    /// Per-call override of the transport's emulation settings
    pub emulation: Option<SyncConfig>,
    success: Option<SuccessFn>,
    error: Option<ErrorFn>,
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("url", &self.url)
            .field("attrs", &self.attrs)
            .field("emulation", &self.emulation)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_attrs(mut self, attrs: Option<Attributes>) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_emulation(mut self, emulation: SyncConfig) -> Self {
        self.emulation = Some(emulation);
        self
    }

    pub fn on_success(mut self, success: impl FnOnce(serde_json::Value) + 'static) -> Self {
        self.success = Some(Box::new(success));
        self
    }

    pub fn on_error(mut self, error: impl FnOnce(TransportError) + 'static) -> Self {
        self.error = Some(Box::new(error));
        self
    }

    /// Delivers the outcome of the remote operation, consuming the callbacks.
    pub fn complete(self, outcome: std::result::Result<serde_json::Value, TransportError>) {
        match outcome {
            Ok(payload) => {
                if let Some(success) = self.success {
                    success(payload);
                }
            }
            Err(error) => {
                if let Some(handler) = self.error {
                    handler(error);
                }
            }
        }
    }
}

/// Injected capability that performs remote operations.
///
/// Implementations return `Err` only for failures detected before the request
/// leaves (for example a URL that cannot be built). Remote failures go through
/// [`SyncOptions::complete`].
pub trait Transport {
    fn sync(&self, verb: Verb, target: SyncTarget, options: SyncOptions) -> Result<()>;
}

/// Caller-supplied outcome handlers for a persistence call on `T`.
pub struct Handlers<T> {
    pub(crate) success: Option<Box<dyn FnOnce(&T, &serde_json::Value)>>,
    pub(crate) error: Option<Box<dyn FnOnce(&T, &TransportError)>>,
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self {
            success: None,
            error: None,
        }
    }
}

impl<T> fmt::Debug for Handlers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl<T> Handlers<T> {
    pub fn on_success(mut self, f: impl FnOnce(&T, &serde_json::Value) + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&T, &TransportError) + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

/// Resolves the transport for a call, preferring the first configured one.
pub(crate) fn pick_transport(
    candidates: &[Option<Rc<dyn Transport>>],
    target: impl FnOnce() -> String,
) -> Result<Rc<dyn Transport>> {
    candidates
        .iter()
        .flatten()
        .next()
        .cloned()
        .ok_or_else(|| SyncError::NoTransport { target: target() }.into())
}
