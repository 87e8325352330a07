//! Options accepted by record set operations.

use crate::{
    RecordSet, SetOptions,
    sync::{Handlers, TransportError},
};

/// Options for [`RecordSet::set`](crate::RecordSet::set).
///
/// The defaults add unknown records, merge known ones, remove absent ones
/// and keep comparator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub add: bool,
    pub remove: bool,
    pub merge: bool,
    /// Re-sort after inserting, when a comparator exists and `at` is unset
    pub sort: bool,
    /// Insert new records at this index instead of appending
    pub at: Option<usize>,
    pub silent: bool,
    /// Validate raw payloads and merges
    pub validate: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            add: true,
            remove: true,
            merge: true,
            sort: true,
            at: None,
            silent: false,
            validate: false,
        }
    }
}

impl ReconcileOptions {
    pub fn with_add(mut self, add: bool) -> Self {
        self.add = add;
        self
    }

    pub fn with_remove(mut self, remove: bool) -> Self {
        self.remove = remove;
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_at(mut self, at: usize) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Options passed on to record-level `set` calls.
    pub(crate) fn record_options(&self) -> SetOptions {
        SetOptions {
            unset: false,
            silent: self.silent,
            validate: self.validate,
        }
    }
}

/// Options for [`RecordSet::add`](crate::RecordSet::add) and the push/unshift shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Merge attributes into records already present
    pub merge: bool,
    pub sort: bool,
    pub at: Option<usize>,
    pub silent: bool,
    pub validate: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            merge: false,
            sort: true,
            at: None,
            silent: false,
            validate: false,
        }
    }
}

impl AddOptions {
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_at(mut self, at: usize) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl From<AddOptions> for ReconcileOptions {
    fn from(options: AddOptions) -> Self {
        ReconcileOptions {
            add: true,
            remove: false,
            merge: options.merge,
            sort: options.sort,
            at: options.at,
            silent: options.silent,
            validate: options.validate,
        }
    }
}

/// Options for [`RecordSet::remove`](crate::RecordSet::remove), `pop` and `shift`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub silent: bool,
}

/// Options for [`RecordSet::reset`](crate::RecordSet::reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOptions {
    /// Suppress the `"reset"` event
    pub silent: bool,
    pub validate: bool,
}

/// Options for [`RecordSet::sort`](crate::RecordSet::sort).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOptions {
    pub silent: bool,
}

/// Options for [`RecordSet::fetch`](crate::RecordSet::fetch).
#[derive(Debug)]
pub struct SetFetchOptions {
    /// Replace the contents with `reset` instead of reconciling
    pub reset: bool,
    /// Options for the reconciliation of the response
    pub reconcile: ReconcileOptions,
    /// Run the set and record parse hooks over the response
    pub parse: bool,
    pub url: Option<String>,
    pub handlers: Handlers<RecordSet>,
}

impl Default for SetFetchOptions {
    fn default() -> Self {
        Self {
            reset: false,
            reconcile: ReconcileOptions::default(),
            parse: true,
            url: None,
            handlers: Handlers::default(),
        }
    }
}

impl SetFetchOptions {
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_reconcile(mut self, reconcile: ReconcileOptions) -> Self {
        self.reconcile = reconcile;
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(&RecordSet, &serde_json::Value) + 'static) -> Self {
        self.handlers = self.handlers.on_success(f);
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&RecordSet, &TransportError) + 'static) -> Self {
        self.handlers = self.handlers.on_error(f);
        self
    }
}
