//! Options accepted by record mutation and persistence calls.

use crate::{
    Record,
    sync::{Handlers, TransportError},
};

/// Options for [`Record::set`](crate::Record::set) and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Remove the given keys instead of assigning them
    pub unset: bool,
    /// Apply the change without emitting events
    pub silent: bool,
    /// Run the validator before applying
    pub validate: bool,
}

impl SetOptions {
    pub fn with_unset(mut self, unset: bool) -> Self {
        self.unset = unset;
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

/// Options for [`Record::fetch`](crate::Record::fetch).
#[derive(Debug)]
pub struct FetchOptions {
    /// Options for applying the response
    pub set: SetOptions,
    /// Run the record kind's parse hook over the response
    pub parse: bool,
    /// Explicit URL for this call
    pub url: Option<String>,
    pub handlers: Handlers<Record>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            set: SetOptions::default(),
            parse: true,
            url: None,
            handlers: Handlers::default(),
        }
    }
}

/// Options for [`Record::save`](crate::Record::save).
#[derive(Debug)]
pub struct SaveOptions {
    /// Options for the immediate and response-driven `set`; validates by default
    pub set: SetOptions,
    /// Defer applying the new attributes until the server confirms
    pub wait: bool,
    /// Send only the given attributes with a PATCH
    pub patch: bool,
    /// Run the record kind's parse hook over the response
    pub parse: bool,
    /// Explicit URL for this call
    pub url: Option<String>,
    pub handlers: Handlers<Record>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            set: SetOptions::default().with_validate(true),
            wait: false,
            patch: false,
            parse: true,
            url: None,
            handlers: Handlers::default(),
        }
    }
}

/// Options for [`Record::destroy`](crate::Record::destroy).
#[derive(Debug, Default)]
pub struct DestroyOptions {
    /// Keep the record until the server confirms
    pub wait: bool,
    /// Explicit URL for this call
    pub url: Option<String>,
    pub handlers: Handlers<Record>,
}

macro_rules! persistence_builders {
    ($($options:ty),+) => {$(
        impl $options {
            pub fn with_url(mut self, url: impl Into<String>) -> Self {
                self.url = Some(url.into());
                self
            }

            pub fn on_success(
                mut self,
                f: impl FnOnce(&Record, &serde_json::Value) + 'static,
            ) -> Self {
                self.handlers = self.handlers.on_success(f);
                self
            }

            pub fn on_error(mut self, f: impl FnOnce(&Record, &TransportError) + 'static) -> Self {
                self.handlers = self.handlers.on_error(f);
                self
            }
        }
    )+};
}

persistence_builders!(FetchOptions, SaveOptions, DestroyOptions);

impl FetchOptions {
    pub fn with_set(mut self, set: SetOptions) -> Self {
        self.set = set;
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }
}

impl SaveOptions {
    pub fn with_set(mut self, set: SetOptions) -> Self {
        self.set = set;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_patch(mut self, patch: bool) -> Self {
        self.patch = patch;
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }
}

impl DestroyOptions {
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}
