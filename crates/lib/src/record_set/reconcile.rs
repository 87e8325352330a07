//! Reconciliation of a set's members against a list of inputs.

use std::collections::HashSet;

use super::{
    AddOptions, Input, ReconcileOptions, RecordSet, RemoveOptions, ResetOptions, SetEvent,
};
use crate::{Record, RecordEvent, SetOptions, events::Observable, value::Attributes};

impl RecordSet {
    /// Reconciles the members against `inputs` and returns the record now
    /// standing for each accepted input, in input order.
    ///
    /// The call runs in phases:
    ///
    /// 1. Each input is resolved. Inputs matching a member (by identity, or
    ///    by being that record) are kept and, with `merge`, their attributes
    ///    are applied to the member. Other inputs become new records when
    ///    `add` is set; raw attributes failing validation emit `"invalid"` on
    ///    the set and are skipped. New records are indexed immediately, so a
    ///    repeated identity later in the same list merges instead of adding.
    /// 2. With `remove`, members not matched by any input are removed.
    /// 3. New records are inserted at `at`, or appended.
    /// 4. With a comparator, no `at` and `sort` enabled, the members are
    ///    re-sorted once if anything was inserted or a merge changed the
    ///    sort attribute.
    /// 5. Unless silent, every new record emits `"add"`, then the set emits
    ///    one `"sort"` if it sorted.
    pub fn set<I: Into<Input>>(
        &self,
        inputs: impl IntoIterator<Item = I>,
        options: &ReconcileOptions,
    ) -> Vec<Record> {
        let record_options = options.record_options();
        let comparator = self.comparator();
        let sortable = comparator.is_some() && options.at.is_none() && options.sort;
        let sort_attribute = comparator
            .as_ref()
            .and_then(|comparator| comparator.sort_attribute().map(str::to_string));

        let mut sort = false;
        let mut keep: HashSet<String> = HashSet::new();
        let mut to_add: Vec<Record> = Vec::new();
        let mut resolved: Vec<Record> = Vec::new();

        for input in inputs {
            let input = input.into();
            if let Some(existing) = self.get(input.clone()) {
                if options.remove {
                    keep.insert(existing.cid().to_string());
                }
                if options.merge {
                    let incoming = match &input {
                        Input::Record(record) if record.ptr_eq(&existing) => None,
                        Input::Record(record) => Some(record.attributes()),
                        Input::Attributes(attributes) => Some(attributes.clone()),
                    };
                    if let Some(incoming) = incoming {
                        if let Err(error) = existing.set(incoming, &record_options) {
                            tracing::debug!(record = %existing.cid(), %error, "merge rejected");
                        }
                        if sortable
                            && !sort
                            && sort_attribute
                                .as_deref()
                                .is_some_and(|attribute| existing.has_changed(Some(attribute)))
                        {
                            sort = true;
                        }
                    }
                }
                resolved.push(existing);
            } else if options.add {
                let Some(record) = self.prepare(input, &record_options) else {
                    continue;
                };
                self.subscribe(&record);
                self.inner.state.borrow_mut().index(&record);
                to_add.push(record.clone());
                resolved.push(record);
            }
        }

        if options.remove {
            let stale: Vec<Record> = self
                .records()
                .into_iter()
                .filter(|member| !keep.contains(member.cid()))
                .collect();
            if !stale.is_empty() {
                self.remove(
                    stale,
                    &RemoveOptions {
                        silent: options.silent,
                    },
                );
            }
        }

        if !to_add.is_empty() {
            if sortable {
                sort = true;
            }
            let mut state = self.inner.state.borrow_mut();
            match options.at {
                Some(at) => {
                    let at = at.min(state.members.len());
                    state.members.splice(at..at, to_add.iter().cloned());
                }
                None => state.members.extend(to_add.iter().cloned()),
            }
        }

        if sort {
            self.reorder();
        }

        tracing::debug!(
            set = %self.config().name(),
            added = to_add.len(),
            len = self.len(),
            sorted = sort,
            "reconciled"
        );

        if options.silent {
            return resolved;
        }
        for record in &to_add {
            record.trigger(
                "add",
                &RecordEvent::Added {
                    record: record.clone(),
                    collection: self.clone(),
                },
            );
        }
        if sort {
            self.trigger("sort", &SetEvent::Sort { set: self.clone() });
        }
        resolved
    }

    /// Adds `inputs` without removing anything; known records are merged only with `merge`.
    pub fn add<I: Into<Input>>(
        &self,
        inputs: impl IntoIterator<Item = I>,
        options: &AddOptions,
    ) -> Vec<Record> {
        self.set(inputs, &ReconcileOptions::from(*options))
    }

    /// Replaces all members with `inputs`.
    ///
    /// No `"add"` or `"remove"` events fire; a single `"reset"` carries the
    /// previous members instead.
    pub fn reset<I: Into<Input>>(
        &self,
        inputs: impl IntoIterator<Item = I>,
        options: &ResetOptions,
    ) -> Vec<Record> {
        let previous = self.inner.state.borrow_mut().clear();
        for record in &previous {
            self.release(record);
        }
        let added = self.add(
            inputs,
            &AddOptions::default()
                .with_silent(true)
                .with_validate(options.validate),
        );
        if !options.silent {
            self.trigger(
                "reset",
                &SetEvent::Reset {
                    set: self.clone(),
                    previous,
                },
            );
        }
        added
    }

    /// Appends one input, skipping comparator order.
    pub fn push(&self, input: impl Into<Input>, options: &AddOptions) -> Option<Record> {
        let options = options.with_at(self.len());
        self.add([input.into()], &options).into_iter().next()
    }

    /// Prepends one input, skipping comparator order.
    pub fn unshift(&self, input: impl Into<Input>, options: &AddOptions) -> Option<Record> {
        let options = options.with_at(0);
        self.add([input.into()], &options).into_iter().next()
    }

    /// Turns an input into a record belonging to this set.
    ///
    /// Raw attributes become a new record of the set's kind; when validation
    /// is requested and fails, `"invalid"` is emitted on the set and `None`
    /// returned. Existing records only gain a back-reference if they have none.
    pub(crate) fn prepare(&self, input: Input, options: &SetOptions) -> Option<Record> {
        match input {
            Input::Record(record) => {
                record.attach_to(self);
                Some(record)
            }
            Input::Attributes(attributes) => self.build_record(attributes, options),
        }
    }

    fn build_record(&self, attributes: Attributes, options: &SetOptions) -> Option<Record> {
        let record = Record::build(
            self.config().record().clone(),
            attributes.clone(),
            options,
            Some(self),
        );
        if !options.validate {
            return Some(record);
        }
        match record.validation_error() {
            None => Some(record),
            Some(error) => {
                tracing::debug!(set = %self.config().name(), %error, "rejected payload");
                self.trigger(
                    "invalid",
                    &SetEvent::Invalid {
                        set: self.clone(),
                        attributes,
                        error,
                    },
                );
                None
            }
        }
    }
}
