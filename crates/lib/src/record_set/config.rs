//! Configuration shared by record sets of one kind.

use std::{fmt, rc::Rc};

use super::Comparator;
use crate::{RecordConfig, sync::Transport};

/// Parse hook: splits a raw server payload into per-record payloads.
pub type SetParser = Rc<dyn Fn(&serde_json::Value) -> Vec<serde_json::Value>>;

/// Describes a kind of record set.
#[derive(Clone)]
pub struct SetConfig {
    name: String,
    record: Rc<RecordConfig>,
    comparator: Option<Comparator>,
    url: Option<String>,
    parser: Option<SetParser>,
    transport: Option<Rc<dyn Transport>>,
}

impl fmt::Debug for SetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetConfig")
            .field("name", &self.name)
            .field("record", &self.record.name())
            .field("comparator", &self.comparator)
            .field("url", &self.url)
            .field("parser", &self.parser.is_some())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl SetConfig {
    /// A set holding records described by `record`.
    pub fn new(name: impl Into<String>, record: impl Into<Rc<RecordConfig>>) -> Self {
        Self {
            name: name.into(),
            record: record.into(),
            comparator: None,
            url: None,
            parser: None,
            transport: None,
        }
    }

    /// Keeps members ordered by `comparator`.
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_parser(
        mut self,
        parser: impl Fn(&serde_json::Value) -> Vec<serde_json::Value> + 'static,
    ) -> Self {
        self.parser = Some(Rc::new(parser));
        self
    }

    pub fn with_transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration of the member records.
    pub fn record(&self) -> &Rc<RecordConfig> {
        &self.record
    }

    pub fn comparator(&self) -> Option<&Comparator> {
        self.comparator.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn transport(&self) -> Option<Rc<dyn Transport>> {
        self.transport.clone()
    }

    /// Splits a payload into items: arrays yield their elements, objects
    /// yield themselves and anything else yields nothing.
    pub fn split(&self, payload: &serde_json::Value) -> Vec<serde_json::Value> {
        if let Some(parser) = &self.parser {
            return parser(payload);
        }
        match payload {
            serde_json::Value::Array(items) => items.clone(),
            serde_json::Value::Object(_) => vec![payload.clone()],
            _ => Vec::new(),
        }
    }
}
