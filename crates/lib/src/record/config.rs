//! Per-kind configuration shared by every record of that kind.

use std::{fmt, rc::Rc};

use crate::{
    constants::DEFAULT_ID_ATTRIBUTE,
    sync::Transport,
    value::{Attributes, attributes_from_json},
};

use super::ValidationError;

/// Validation hook: receives the merged current and proposed attributes.
pub type Validator = Rc<dyn Fn(&Attributes) -> Result<(), ValidationError>>;

/// Parse hook: turns a raw server payload into attributes.
pub type Parser = Rc<dyn Fn(&serde_json::Value) -> Option<Attributes>>;

/// Describes a kind of record.
///
/// Built once and shared (records hold an `Rc<RecordConfig>`). All hooks are
/// optional; without a validator every change is accepted and without a
/// parser a payload is used as-is when it is a JSON object.
#[derive(Clone)]
pub struct RecordConfig {
    name: String,
    id_attribute: String,
    defaults: Attributes,
    validator: Option<Validator>,
    parser: Option<Parser>,
    url_root: Option<String>,
    transport: Option<Rc<dyn Transport>>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self::new("record")
    }
}

impl fmt::Debug for RecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordConfig")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("defaults", &self.defaults)
            .field("validator", &self.validator.is_some())
            .field("parser", &self.parser.is_some())
            .field("url_root", &self.url_root)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl RecordConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            defaults: Attributes::new(),
            validator: None,
            parser: None,
            url_root: None,
            transport: None,
        }
    }

    /// Uses `attribute` instead of `"id"` as the server identity.
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }

    /// Replaces the defaults merged under construction attributes.
    pub fn with_defaults(mut self, defaults: Attributes) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<crate::Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&Attributes) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    pub fn with_parser(
        mut self,
        parser: impl Fn(&serde_json::Value) -> Option<Attributes> + 'static,
    ) -> Self {
        self.parser = Some(Rc::new(parser));
        self
    }

    /// Base URL for records of this kind outside any set.
    pub fn with_url_root(mut self, root: impl Into<String>) -> Self {
        self.url_root = Some(root.into());
        self
    }

    pub fn with_transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn defaults(&self) -> &Attributes {
        &self.defaults
    }

    pub fn url_root(&self) -> Option<&str> {
        self.url_root.as_deref()
    }

    pub fn transport(&self) -> Option<Rc<dyn Transport>> {
        self.transport.clone()
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Runs the validator, accepting everything when none is configured.
    pub fn validate(&self, attributes: &Attributes) -> Result<(), ValidationError> {
        match &self.validator {
            Some(validator) => validator(attributes),
            None => Ok(()),
        }
    }

    /// Runs the parse hook over a server payload.
    pub fn parse(&self, payload: &serde_json::Value) -> Option<Attributes> {
        match &self.parser {
            Some(parser) => parser(payload),
            None => attributes_from_json(payload),
        }
    }
}
