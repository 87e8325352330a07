//! Record sets: ordered, indexed collections of records.
//!
//! A [`RecordSet`] owns an ordered member list and two indexes (by client id
//! and by server identity). It subscribes to every member's events and
//! re-emits them, which is also how it learns about identity changes
//! (`"change:<id attribute>"`) and destruction (`"destroy"`).
//!
//! Membership changes are announced on the record (`"add"`, `"remove"`) and
//! reach set listeners through that forwarding. A record that belongs to
//! several sets receives membership events from each; every set ignores
//! membership events that name another set.
//!
//! The central operation is [`RecordSet::set`], which reconciles the members
//! against a list of inputs; see its documentation for the phases.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    Record, RecordEvent, Value,
    constants::ALL,
    events::{Callback, Notifier, Observable},
    value::Attributes,
};

mod comparator;
mod config;
mod errors;
mod event;
mod options;
mod persist;
mod reconcile;


pub use comparator::Comparator;
pub use config::{SetConfig, SetParser};
pub use errors::SetError;
pub use event::SetEvent;
pub use options::{
    AddOptions, ReconcileOptions, RemoveOptions, ResetOptions, SetFetchOptions, SortOptions,
};

/// An input to reconciliation: an existing record or raw attributes.
#[derive(Debug, Clone)]
pub enum Input {
    Record(Record),
    Attributes(Attributes),
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Input::Record(record)
    }
}

impl From<&Record> for Input {
    fn from(record: &Record) -> Self {
        Input::Record(record.clone())
    }
}

impl From<Attributes> for Input {
    fn from(attributes: Attributes) -> Self {
        Input::Attributes(attributes)
    }
}

/// What to look a member up by.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The record itself, or the member sharing its identity
    Record(Record),
    /// The member whose identity matches the id attribute
    Attributes(Attributes),
    /// An identity key or client id
    Key(String),
}

impl From<Record> for Lookup {
    fn from(record: Record) -> Self {
        Lookup::Record(record)
    }
}

impl From<&Record> for Lookup {
    fn from(record: &Record) -> Self {
        Lookup::Record(record.clone())
    }
}

impl From<&Attributes> for Lookup {
    fn from(attributes: &Attributes) -> Self {
        Lookup::Attributes(attributes.clone())
    }
}

impl From<Input> for Lookup {
    fn from(input: Input) -> Self {
        match input {
            Input::Record(record) => Lookup::Record(record),
            Input::Attributes(attributes) => Lookup::Attributes(attributes),
        }
    }
}

impl From<&str> for Lookup {
    fn from(key: &str) -> Self {
        Lookup::Key(key.to_string())
    }
}

impl From<String> for Lookup {
    fn from(key: String) -> Self {
        Lookup::Key(key)
    }
}

impl From<i64> for Lookup {
    fn from(id: i64) -> Self {
        Lookup::Key(id.to_string())
    }
}

impl From<i32> for Lookup {
    fn from(id: i32) -> Self {
        Lookup::Key(id.to_string())
    }
}

impl From<&Value> for Lookup {
    fn from(id: &Value) -> Self {
        Lookup::Key(id.identity_key().unwrap_or_default())
    }
}

#[derive(Default)]
struct SetState {
    members: Vec<Record>,
    by_cid: HashMap<String, Record>,
    by_id: HashMap<String, Record>,
    /// Identity key each indexed record was filed under, by client id
    id_keys: HashMap<String, String>,
    comparator: Option<Comparator>,
}

impl SetState {
    fn index(&mut self, record: &Record) {
        self.by_cid.insert(record.cid().to_string(), record.clone());
        if let Some(key) = record.id_key() {
            self.by_id.insert(key.clone(), record.clone());
            self.id_keys.insert(record.cid().to_string(), key);
        }
    }

    fn unindex(&mut self, record: &Record) {
        self.by_cid.remove(record.cid());
        self.unindex_identity(record);
    }

    fn unindex_identity(&mut self, record: &Record) {
        if let Some(key) = self.id_keys.remove(record.cid())
            && self.by_id.get(&key).is_some_and(|filed| filed.ptr_eq(record))
        {
            self.by_id.remove(&key);
        }
    }

    fn position(&self, record: &Record) -> Option<usize> {
        self.members.iter().position(|member| member.ptr_eq(record))
    }

    fn clear(&mut self) -> Vec<Record> {
        self.by_cid.clear();
        self.by_id.clear();
        self.id_keys.clear();
        std::mem::take(&mut self.members)
    }
}

pub(crate) struct SetInner {
    config: Rc<SetConfig>,
    events: Notifier<SetEvent>,
    state: RefCell<SetState>,
    /// Subscription installed on every member
    forward: Callback<RecordEvent>,
}

/// Non-owning reference from a record back to its set.
#[derive(Clone)]
pub(crate) struct WeakRecordSet(Weak<SetInner>);

impl WeakRecordSet {
    pub(crate) fn upgrade(&self) -> Option<RecordSet> {
        self.0.upgrade().map(|inner| RecordSet { inner })
    }

    pub(crate) fn points_to(&self, set: &RecordSet) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&set.inner))
    }
}

/// A shared handle to an ordered, indexed collection of records.
#[derive(Clone)]
pub struct RecordSet {
    inner: Rc<SetInner>,
}

impl RecordSet {
    pub fn new(config: impl Into<Rc<SetConfig>>) -> Self {
        let config = config.into();
        let comparator = config.comparator().cloned();
        let inner = Rc::new_cyclic(|weak: &Weak<SetInner>| {
            let weak = weak.clone();
            SetInner {
                config,
                events: Notifier::new(),
                state: RefCell::new(SetState {
                    comparator,
                    ..SetState::default()
                }),
                forward: Callback::new(move |name, event: &RecordEvent| {
                    if let Some(inner) = weak.upgrade() {
                        RecordSet { inner }.on_member_event(name, event);
                    }
                }),
            }
        });
        RecordSet { inner }
    }

    /// Creates a set and silently resets it to `inputs`.
    pub fn with_records<I: Into<Input>>(
        config: impl Into<Rc<SetConfig>>,
        inputs: impl IntoIterator<Item = I>,
    ) -> Self {
        let set = Self::new(config);
        set.reset(
            inputs,
            &ResetOptions {
                silent: true,
                validate: false,
            },
        );
        set
    }

    pub fn config(&self) -> &Rc<SetConfig> {
        &self.inner.config
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().members.is_empty()
    }

    /// Snapshot of the members in order.
    pub fn records(&self) -> Vec<Record> {
        self.inner.state.borrow().members.clone()
    }

    pub fn at(&self, index: usize) -> Option<Record> {
        self.inner.state.borrow().members.get(index).cloned()
    }

    pub fn first(&self) -> Option<Record> {
        self.inner.state.borrow().members.first().cloned()
    }

    pub fn last(&self) -> Option<Record> {
        self.inner.state.borrow().members.last().cloned()
    }

    /// Members in `start..end`, clamped to the set's bounds.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Record> {
        let state = self.inner.state.borrow();
        let end = end.min(state.members.len());
        let start = start.min(end);
        state.members[start..end].to_vec()
    }

    /// Looks a member up by record, attributes, identity key or client id.
    pub fn get(&self, lookup: impl Into<Lookup>) -> Option<Record> {
        let id_attribute = self.inner.config.record().id_attribute();
        let state = self.inner.state.borrow();
        match lookup.into() {
            Lookup::Record(record) => record
                .id_key()
                .and_then(|key| state.by_id.get(&key))
                .or_else(|| state.by_cid.get(record.cid()))
                .cloned(),
            Lookup::Attributes(attributes) => attributes
                .get(id_attribute)
                .and_then(Value::identity_key)
                .and_then(|key| state.by_id.get(&key))
                .cloned(),
            Lookup::Key(key) => state
                .by_id
                .get(&key)
                .or_else(|| state.by_cid.get(&key))
                .cloned(),
        }
    }

    pub fn index_of(&self, record: &Record) -> Option<usize> {
        self.inner.state.borrow().position(record)
    }

    /// Whether `record` itself is a member.
    pub fn contains(&self, record: &Record) -> bool {
        self.inner.state.borrow().by_cid.contains_key(record.cid())
    }

    /// Members whose attributes equal every entry of `attributes`.
    ///
    /// An empty filter matches nothing.
    pub fn where_attrs(&self, attributes: &Attributes) -> Vec<Record> {
        if attributes.is_empty() {
            return Vec::new();
        }
        self.records()
            .into_iter()
            .filter(|record| Self::matches(record, attributes))
            .collect()
    }

    /// First member matching [`where_attrs`](Self::where_attrs).
    pub fn find_where(&self, attributes: &Attributes) -> Option<Record> {
        if attributes.is_empty() {
            return None;
        }
        self.records()
            .into_iter()
            .find(|record| Self::matches(record, attributes))
    }

    /// One attribute from every member, in order.
    pub fn pluck(&self, attribute: &str) -> Vec<Option<Value>> {
        self.records()
            .iter()
            .map(|record| record.get(attribute))
            .collect()
    }

    /// Members as a JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.records().iter().map(Record::to_json).collect())
    }

    /// Removes the given members, returning those that were present.
    ///
    /// Each removed record emits `"remove"` with the index it held at the
    /// moment of its removal, then loses its back-reference if it pointed here.
    pub fn remove<L: Into<Lookup>>(
        &self,
        items: impl IntoIterator<Item = L>,
        options: &RemoveOptions,
    ) -> Vec<Record> {
        let mut removed = Vec::new();
        for item in items {
            let Some(record) = self.get(item) else {
                continue;
            };
            let index = {
                let mut state = self.inner.state.borrow_mut();
                state.unindex(&record);
                let Some(index) = state.position(&record) else {
                    continue;
                };
                state.members.remove(index);
                index
            };
            tracing::trace!(set = %self.config().name(), record = %record.cid(), index, "removed");
            if !options.silent {
                record.trigger(
                    "remove",
                    &RecordEvent::Removed {
                        record: record.clone(),
                        collection: self.clone(),
                        index,
                    },
                );
            }
            self.release(&record);
            removed.push(record);
        }
        removed
    }

    /// Removes and returns the last member.
    pub fn pop(&self, options: &RemoveOptions) -> Option<Record> {
        let last = self.last()?;
        self.remove([last], options).into_iter().next()
    }

    /// Removes and returns the first member.
    pub fn shift(&self, options: &RemoveOptions) -> Option<Record> {
        let first = self.first()?;
        self.remove([first], options).into_iter().next()
    }

    /// Whether both handles refer to the same set.
    pub fn ptr_eq(&self, other: &RecordSet) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRecordSet {
        WeakRecordSet(Rc::downgrade(&self.inner))
    }

    fn matches(record: &Record, attributes: &Attributes) -> bool {
        record.with_attributes(|own| {
            attributes
                .iter()
                .all(|(key, value)| own.get(key) == Some(value))
        })
    }

    /// Starts forwarding `record`'s events.
    fn subscribe(&self, record: &Record) {
        record.events().on_with_context(
            ALL,
            self.inner.forward.clone(),
            Some(self.inner.events.id()),
        );
    }

    /// Stops forwarding `record`'s events and clears its back-reference to this set.
    fn release(&self, record: &Record) {
        record.detach_from(self);
        record.events().off(
            Some(ALL),
            Some(&self.inner.forward),
            Some(self.inner.events.id()),
        );
    }

    fn on_member_event(&self, name: &str, event: &RecordEvent) {
        if matches!(name, "add" | "remove")
            && event.collection().is_none_or(|owner| !owner.ptr_eq(self))
        {
            return;
        }
        let record = event.record();
        if name == "destroy" {
            self.remove([record.clone()], &RemoveOptions::default());
        }
        if name
            .strip_prefix("change:")
            .is_some_and(|attribute| attribute == record.config().id_attribute())
        {
            self.reindex_identity(record);
        }
        self.trigger(name, &SetEvent::Member(event.clone()));
    }

    fn reindex_identity(&self, record: &Record) {
        let mut state = self.inner.state.borrow_mut();
        if !state.by_cid.contains_key(record.cid()) {
            return;
        }
        state.unindex_identity(record);
        if let Some(key) = record.id_key() {
            tracing::trace!(set = %self.inner.config.name(), record = %record.cid(), %key, "identity changed");
            state.by_id.insert(key.clone(), record.clone());
            state.id_keys.insert(record.cid().to_string(), key);
        }
    }
}

impl Observable for RecordSet {
    type Event = SetEvent;

    fn events(&self) -> &Notifier<SetEvent> {
        &self.inner.events
    }
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("RecordSet");
        debug.field("name", &self.inner.config.name());
        match self.inner.state.try_borrow() {
            Ok(state) => debug.field("len", &state.members.len()).finish(),
            Err(_) => debug.finish_non_exhaustive(),
        }
    }
}
