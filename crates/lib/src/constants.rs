//! Constants used throughout the vertebra library.
//!
//! This module provides central definitions for reserved event names, default
//! attribute names and the strings used at the transport boundary.

/// Default name of the attribute that carries a record's server identity.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Reserved event name that receives every event, with the real name passed first.
pub const ALL: &str = "all";

/// Prefix for process-unique client ids (`c1`, `c2`, ...).
pub const CLIENT_ID_PREFIX: &str = "c";

/// Prefix for per-view delegation namespaces.
pub const VIEW_ID_PREFIX: &str = "view";

/// Default interval between fragment checks when the history falls back to polling.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default application root for the history.
pub const DEFAULT_ROOT: &str = "/";

/// Header used to carry the real HTTP method when verb emulation is on.
pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";

/// Form field carrying the real HTTP method when both emulation modes are on.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Form field wrapping the JSON payload when form emulation is on.
pub const EMULATED_JSON_FIELD: &str = "model";

/// Content type of a JSON request body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type of an emulated form body.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
