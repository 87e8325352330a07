use crate::{
    Record, RecordEvent, RecordSet, ValidationError,
    sync::{TransportError, Verb},
    value::Attributes,
};

/// Event emitted by a [`RecordSet`].
///
/// Every member event is re-emitted under its original name as `Member`,
/// including the `"add"` and `"remove"` membership events.
#[derive(Debug, Clone)]
pub enum SetEvent {
    Member(RecordEvent),
    Reset {
        set: RecordSet,
        previous: Vec<Record>,
    },
    Sort {
        set: RecordSet,
    },
    /// A raw payload failed validation and was not added
    Invalid {
        set: RecordSet,
        attributes: Attributes,
        error: ValidationError,
    },
    Request {
        set: RecordSet,
        verb: Verb,
    },
    Sync {
        set: RecordSet,
        response: serde_json::Value,
    },
    Error {
        set: RecordSet,
        error: TransportError,
    },
}

impl SetEvent {
    /// The forwarded member event, if this is one.
    pub fn member(&self) -> Option<&RecordEvent> {
        match self {
            SetEvent::Member(event) => Some(event),
            _ => None,
        }
    }

    /// The record a forwarded member event concerns.
    pub fn record(&self) -> Option<&Record> {
        self.member().map(RecordEvent::record)
    }
}
