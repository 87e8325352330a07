//! Payloads of the events a record emits.

use crate::{
    Record, RecordSet, ValidationError, Value,
    record::SetOptions,
    sync::{TransportError, Verb},
};

/// Event emitted by a [`Record`].
///
/// | name | variant |
/// |------|---------|
/// | `change:<attr>` | `AttributeChanged` |
/// | `change` | `Changed` |
/// | `invalid` | `Invalid` |
/// | `request` | `Request` |
/// | `sync` | `Sync` |
/// | `error` | `Error` |
/// | `destroy` | `Destroy` |
/// | `add` | `Added` |
/// | `remove` | `Removed` |
/// | anything else | `Custom` |
#[derive(Debug, Clone)]
pub enum RecordEvent {
    AttributeChanged {
        record: Record,
        attribute: String,
        /// Value at the time of dispatch; `None` after an unset
        value: Option<Value>,
        options: SetOptions,
    },
    Changed {
        record: Record,
        options: SetOptions,
    },
    Invalid {
        record: Record,
        error: ValidationError,
    },
    Request {
        record: Record,
        verb: Verb,
    },
    Sync {
        record: Record,
        response: serde_json::Value,
    },
    Error {
        record: Record,
        error: TransportError,
    },
    Destroy {
        record: Record,
        collection: Option<RecordSet>,
    },
    Added {
        record: Record,
        collection: RecordSet,
    },
    Removed {
        record: Record,
        collection: RecordSet,
        index: usize,
    },
    Custom {
        record: Record,
        data: Value,
    },
}

impl RecordEvent {
    /// The record that emitted the event.
    pub fn record(&self) -> &Record {
        match self {
            RecordEvent::AttributeChanged { record, .. }
            | RecordEvent::Changed { record, .. }
            | RecordEvent::Invalid { record, .. }
            | RecordEvent::Request { record, .. }
            | RecordEvent::Sync { record, .. }
            | RecordEvent::Error { record, .. }
            | RecordEvent::Destroy { record, .. }
            | RecordEvent::Added { record, .. }
            | RecordEvent::Removed { record, .. }
            | RecordEvent::Custom { record, .. } => record,
        }
    }

    /// The set named by membership events.
    pub fn collection(&self) -> Option<&RecordSet> {
        match self {
            RecordEvent::Added { collection, .. } | RecordEvent::Removed { collection, .. } => {
                Some(collection)
            }
            RecordEvent::Destroy { collection, .. } => collection.as_ref(),
            _ => None,
        }
    }

    /// The attribute and new value of a `change:<attr>` event.
    pub fn attribute_change(&self) -> Option<(&str, Option<&Value>)> {
        match self {
            RecordEvent::AttributeChanged {
                attribute, value, ..
            } => Some((attribute, value.as_ref())),
            _ => None,
        }
    }
}
