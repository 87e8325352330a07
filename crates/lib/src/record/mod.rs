//! Records: observable attribute maps with change tracking.
//!
//! A [`Record`] is a cheap, clonable handle; clones share the same state and
//! event registry. All mutation goes through [`Record::set`], which validates,
//! applies, and then announces the change with one `"change:<attr>"` event per
//! changed attribute followed by `"change"`.
//!
//! ## Reentrancy
//!
//! Handlers are free to call `set` again on the record that is notifying them.
//! The outermost call owns the mutation: it snapshots the previous attributes,
//! clears the changed set and, after its own attribute events, keeps emitting
//! `"change"` until no nested call has requested another round. A nested call
//! merges its writes into the same changed set and only emits its own
//! attribute events. Previous values therefore always describe the state
//! before the outermost call began.
//!
//! ## Example
//!
//! ```
//! use vertebra::{Observable, Record, RecordConfig, RecordEvent, SetOptions, attrs, events::Callback};
//!
//! let record = Record::new(RecordConfig::new("book"), attrs! { "title" => "Dune" });
//! record.on("change:title", Callback::new(|_: &str, event: &RecordEvent| {
//!     let record = event.record();
//!     assert_eq!(record.previous("title").unwrap(), "Dune");
//! }));
//!
//! record.set(attrs! { "title" => "Emma" }, &SetOptions::default()).unwrap();
//! assert!(record.has_changed(Some("title")));
//! assert_eq!(record.changed_attributes().unwrap().len(), 1);
//! ```

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    RecordSet,
    constants::CLIENT_ID_PREFIX,
    events::{Notifier, Observable},
    record_set::WeakRecordSet,
    value::{Attributes, Changes, Value},
};

mod config;
mod errors;
mod event;
mod options;
mod persist;


pub use config::{Parser, RecordConfig, Validator};
pub use errors::ValidationError;
pub use event::RecordEvent;
pub use options::{DestroyOptions, FetchOptions, SaveOptions, SetOptions};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique client id with the given prefix.
pub(crate) fn unique_id(prefix: &str) -> String {
    format!("{prefix}{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Default)]
struct RecordState {
    attributes: Attributes,
    id: Option<Value>,
    changed: Changes,
    previous: Attributes,
    validation_error: Option<ValidationError>,
    changing: bool,
    pending: bool,
}

struct RecordInner {
    cid: String,
    config: Rc<RecordConfig>,
    events: Notifier<RecordEvent>,
    state: RefCell<RecordState>,
    collection: RefCell<Option<WeakRecordSet>>,
}

/// A shared handle to an observable attribute map.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

/// Resets the reentrancy flags when the outermost `set` finishes, even by unwinding.
struct OutermostSet<'a>(&'a RecordInner);

impl Drop for OutermostSet<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.state.try_borrow_mut() {
            state.changing = false;
            state.pending = false;
        }
    }
}

impl Record {
    /// Creates a record from defaults overlaid with `attributes`.
    pub fn new(config: impl Into<Rc<RecordConfig>>, attributes: Attributes) -> Self {
        Self::build(config.into(), attributes, &SetOptions::default(), None)
    }

    /// Like [`new`](Self::new), applying the initial attributes with `options`.
    ///
    /// With `validate` set, an invalid initial state leaves the record empty
    /// and [`validation_error`](Self::validation_error) populated.
    pub fn with_options(
        config: impl Into<Rc<RecordConfig>>,
        attributes: Attributes,
        options: &SetOptions,
    ) -> Self {
        Self::build(config.into(), attributes, options, None)
    }

    /// Creates a record from a raw server payload through the parse hook.
    pub fn from_json(config: impl Into<Rc<RecordConfig>>, payload: &serde_json::Value) -> Self {
        let config = config.into();
        let attributes = config.parse(payload).unwrap_or_default();
        Self::build(config, attributes, &SetOptions::default(), None)
    }

    pub(crate) fn build(
        config: Rc<RecordConfig>,
        attributes: Attributes,
        options: &SetOptions,
        collection: Option<&RecordSet>,
    ) -> Self {
        let mut merged = attributes;
        for (key, value) in config.defaults() {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
        let record = Record {
            inner: Rc::new(RecordInner {
                cid: unique_id(CLIENT_ID_PREFIX),
                config,
                events: Notifier::new(),
                state: RefCell::new(RecordState::default()),
                collection: RefCell::new(collection.map(RecordSet::downgrade)),
            }),
        };
        if let Err(error) = record.set(merged, options) {
            tracing::debug!(record = %record.cid(), %error, "initial attributes rejected");
        }
        record.inner.state.borrow_mut().changed.clear();
        record
    }

    /// Process-unique client id.
    pub fn cid(&self) -> &str {
        &self.inner.cid
    }

    pub fn config(&self) -> &Rc<RecordConfig> {
        &self.inner.config
    }

    /// Server identity, mirrored from the id attribute.
    pub fn id(&self) -> Option<Value> {
        self.inner.state.borrow().id.clone()
    }

    /// The identity as an index key.
    pub fn id_key(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .id
            .as_ref()
            .and_then(Value::identity_key)
    }

    /// True until the record has a server identity.
    pub fn is_new(&self) -> bool {
        self.inner.state.borrow().id.is_none()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().attributes.get(key).cloned()
    }

    /// Whether `key` holds a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.inner
            .state
            .borrow()
            .attributes
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> Attributes {
        self.inner.state.borrow().attributes.clone()
    }

    /// Runs `f` over the attributes without copying them.
    pub fn with_attributes<R>(&self, f: impl FnOnce(&Attributes) -> R) -> R {
        f(&self.inner.state.borrow().attributes)
    }

    pub fn keys(&self) -> Vec<String> {
        self.with_attributes(|attributes| attributes.keys().cloned().collect())
    }

    pub fn values(&self) -> Vec<Value> {
        self.with_attributes(|attributes| attributes.values().cloned().collect())
    }

    /// The attributes named in `keys`, in attribute order.
    pub fn pick(&self, keys: &[&str]) -> Attributes {
        self.with_attributes(|attributes| {
            attributes
                .iter()
                .filter(|(key, _)| keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// Every attribute except those named in `keys`.
    pub fn omit(&self, keys: &[&str]) -> Attributes {
        self.with_attributes(|attributes| {
            attributes
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// Applies `attributes`.
    ///
    /// Returns the validator's error when `options.validate` is set and the
    /// merged result is rejected; in that case nothing changes and no change
    /// events fire, but `"invalid"` does.
    pub fn set(&self, attributes: Attributes, options: &SetOptions) -> Result<(), ValidationError> {
        self.check_valid(&attributes, options)?;

        let id_attribute = self.inner.config.id_attribute();
        let mut changes = Vec::new();
        let outermost = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let outermost = !state.changing;
            state.changing = true;
            if outermost {
                state.previous = state.attributes.clone();
                state.changed.clear();
            }

            if let Some(value) = attributes.get(id_attribute) {
                state.id = if options.unset || value.is_null() {
                    None
                } else {
                    Some(value.clone())
                };
            }

            for (key, value) in attributes {
                let differs = if options.unset {
                    state.attributes.contains_key(&key)
                } else {
                    state.attributes.get(&key) != Some(&value)
                };
                if differs {
                    changes.push(key.clone());
                }

                let back_to_previous = if options.unset {
                    !state.previous.contains_key(&key)
                } else {
                    state.previous.get(&key) == Some(&value)
                };
                if back_to_previous {
                    state.changed.shift_remove(&key);
                } else {
                    let recorded = (!options.unset).then(|| value.clone());
                    state.changed.insert(key.clone(), recorded);
                }

                if options.unset {
                    state.attributes.shift_remove(&key);
                } else {
                    state.attributes.insert(key, value);
                }
            }
            outermost
        };
        let _outermost = outermost.then(|| OutermostSet(&self.inner));

        if !options.silent {
            if !changes.is_empty() {
                self.inner.state.borrow_mut().pending = true;
            }
            for attribute in changes {
                let value = self.get(&attribute);
                self.trigger(
                    &format!("change:{attribute}"),
                    &RecordEvent::AttributeChanged {
                        record: self.clone(),
                        attribute,
                        value,
                        options: *options,
                    },
                );
            }
        }

        if !outermost {
            return Ok(());
        }
        if !options.silent {
            while self.take_pending() {
                tracing::trace!(record = %self.cid(), "change round");
                self.trigger(
                    "change",
                    &RecordEvent::Changed {
                        record: self.clone(),
                        options: *options,
                    },
                );
            }
        }
        Ok(())
    }

    /// Sets a single attribute.
    pub fn set_one(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        options: &SetOptions,
    ) -> Result<(), ValidationError> {
        let mut attributes = Attributes::new();
        attributes.insert(key.into(), value.into());
        self.set(attributes, options)
    }

    /// Removes one attribute, emitting change events if it was present.
    pub fn unset(&self, key: &str, options: &SetOptions) -> Result<(), ValidationError> {
        let mut attributes = Attributes::new();
        attributes.insert(key.to_string(), Value::Null);
        self.set(attributes, &options.with_unset(true))
    }

    /// Removes every attribute.
    pub fn clear(&self, options: &SetOptions) -> Result<(), ValidationError> {
        let attributes = self.with_attributes(|attributes| {
            attributes
                .keys()
                .map(|key| (key.clone(), Value::Null))
                .collect()
        });
        self.set(attributes, &options.with_unset(true))
    }

    /// Whether the last outermost `set` changed anything, or changed `attribute`.
    pub fn has_changed(&self, attribute: Option<&str>) -> bool {
        let state = self.inner.state.borrow();
        match attribute {
            Some(attribute) => state.changed.contains_key(attribute),
            None => !state.changed.is_empty(),
        }
    }

    /// The changes of the last outermost `set`, or `None` when nothing changed.
    ///
    /// Unset attributes map to `None`.
    pub fn changed_attributes(&self) -> Option<Changes> {
        let state = self.inner.state.borrow();
        (!state.changed.is_empty()).then(|| state.changed.clone())
    }

    /// The subset of `diff` that would change the record, or `None`.
    ///
    /// While a mutation is in progress the comparison is made against the
    /// state before it began.
    pub fn changed_attributes_against(&self, diff: &Attributes) -> Option<Attributes> {
        let state = self.inner.state.borrow();
        let baseline = if state.changing {
            &state.previous
        } else {
            &state.attributes
        };
        let changed: Attributes = diff
            .iter()
            .filter(|(key, value)| baseline.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        (!changed.is_empty()).then_some(changed)
    }

    /// Value of `attribute` before the last outermost `set`.
    pub fn previous(&self, attribute: &str) -> Option<Value> {
        self.inner.state.borrow().previous.get(attribute).cloned()
    }

    /// All attributes as they were before the last outermost `set`.
    pub fn previous_attributes(&self) -> Attributes {
        self.inner.state.borrow().previous.clone()
    }

    /// The error of the most recent failed validation.
    pub fn validation_error(&self) -> Option<ValidationError> {
        self.inner.state.borrow().validation_error.clone()
    }

    /// Validates the current attributes.
    pub fn is_valid(&self) -> bool {
        self.check_valid(
            &Attributes::new(),
            &SetOptions::default().with_validate(true),
        )
        .is_ok()
    }

    /// Attributes as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        self.with_attributes(crate::value::attributes_to_json)
    }

    /// A new record of the same kind with the same attributes and a fresh client id.
    pub fn duplicate(&self) -> Record {
        Record::new(self.inner.config.clone(), self.attributes())
    }

    /// The set this record belongs to, if it is still alive.
    pub fn collection(&self) -> Option<RecordSet> {
        self.inner
            .collection
            .borrow()
            .as_ref()
            .and_then(WeakRecordSet::upgrade)
    }

    pub(crate) fn attach_to(&self, set: &RecordSet) {
        let mut collection = self.inner.collection.borrow_mut();
        if collection.as_ref().and_then(WeakRecordSet::upgrade).is_none() {
            *collection = Some(set.downgrade());
        }
    }

    pub(crate) fn detach_from(&self, set: &RecordSet) {
        let mut collection = self.inner.collection.borrow_mut();
        if collection.as_ref().is_some_and(|owner| owner.points_to(set)) {
            *collection = None;
        }
    }

    /// Whether both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs the validator over current ∪ proposed attributes.
    pub(crate) fn check_valid(
        &self,
        attributes: &Attributes,
        options: &SetOptions,
    ) -> Result<(), ValidationError> {
        if !options.validate || !self.inner.config.has_validator() {
            return Ok(());
        }
        let mut merged = self.attributes();
        for (key, value) in attributes {
            if options.unset {
                merged.shift_remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
        match self.inner.config.validate(&merged) {
            Ok(()) => {
                self.inner.state.borrow_mut().validation_error = None;
                Ok(())
            }
            Err(error) => {
                tracing::debug!(record = %self.cid(), %error, "validation failed");
                self.inner.state.borrow_mut().validation_error = Some(error.clone());
                self.trigger(
                    "invalid",
                    &RecordEvent::Invalid {
                        record: self.clone(),
                        error: error.clone(),
                    },
                );
                Err(error)
            }
        }
    }

    fn take_pending(&self) -> bool {
        std::mem::take(&mut self.inner.state.borrow_mut().pending)
    }
}

impl Observable for Record {
    type Event = RecordEvent;

    fn events(&self) -> &Notifier<RecordEvent> {
        &self.inner.events
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Record")
                .field("kind", &self.inner.config.name())
                .field("cid", &self.inner.cid)
                .field("id", &state.id)
                .field("attributes", &state.attributes)
                .finish(),
            Err(_) => f
                .debug_struct("Record")
                .field("cid", &self.inner.cid)
                .finish_non_exhaustive(),
        }
    }
}
