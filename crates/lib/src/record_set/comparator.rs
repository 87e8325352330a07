//! Member ordering.

use std::{cmp::Ordering, fmt, rc::Rc};

use super::{RecordSet, SetError, SetEvent, SortOptions};
use crate::{Record, Result, Value, events::Observable};

/// How a set orders its members.
///
/// All three forms sort stably, so members with equal keys keep their
/// relative order.
#[derive(Clone)]
pub enum Comparator {
    /// Order by one attribute; records without it sort last
    Attribute(String),
    /// Order by a derived key
    Key(Rc<dyn Fn(&Record) -> Value>),
    /// Order by a pairwise comparison
    Compare(Rc<dyn Fn(&Record, &Record) -> Ordering>),
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Comparator::Key(_) => f.write_str("Key(..)"),
            Comparator::Compare(_) => f.write_str("Compare(..)"),
        }
    }
}

impl Comparator {
    pub fn attribute(name: impl Into<String>) -> Self {
        Comparator::Attribute(name.into())
    }

    pub fn key(f: impl Fn(&Record) -> Value + 'static) -> Self {
        Comparator::Key(Rc::new(f))
    }

    pub fn compare(f: impl Fn(&Record, &Record) -> Ordering + 'static) -> Self {
        Comparator::Compare(Rc::new(f))
    }

    /// The attribute whose change can invalidate the order, for attribute comparators.
    pub fn sort_attribute(&self) -> Option<&str> {
        match self {
            Comparator::Attribute(name) => Some(name),
            _ => None,
        }
    }

    /// Relative order of two records.
    pub fn ordering(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            Comparator::Attribute(name) => {
                Value::compare_optional(a.get(name).as_ref(), b.get(name).as_ref())
            }
            Comparator::Key(key) => key(a).compare(&key(b)),
            Comparator::Compare(compare) => compare(a, b),
        }
    }

    /// Sorts `records` in place, computing each key once.
    pub(crate) fn order(&self, records: &mut Vec<Record>) {
        match self {
            Comparator::Attribute(name) => {
                let mut keyed: Vec<(Option<Value>, Record)> = records
                    .drain(..)
                    .map(|record| (record.get(name), record))
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| Value::compare_optional(a.as_ref(), b.as_ref()));
                records.extend(keyed.into_iter().map(|(_, record)| record));
            }
            Comparator::Key(key) => {
                let mut keyed: Vec<(Value, Record)> = records
                    .drain(..)
                    .map(|record| (key(&record), record))
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| a.compare(b));
                records.extend(keyed.into_iter().map(|(_, record)| record));
            }
            Comparator::Compare(compare) => records.sort_by(|a, b| compare(a, b)),
        }
    }
}

impl RecordSet {
    /// The comparator currently in effect.
    pub fn comparator(&self) -> Option<Comparator> {
        self.inner.state.borrow().comparator.clone()
    }

    /// Replaces the comparator. The members are not re-sorted until the next `sort`.
    pub fn set_comparator(&self, comparator: Option<Comparator>) {
        self.inner.state.borrow_mut().comparator = comparator;
    }

    /// Re-sorts the members and emits `"sort"`.
    pub fn sort(&self, options: &SortOptions) -> Result<()> {
        if self.comparator().is_none() {
            return Err(self.no_comparator().into());
        }
        self.reorder();
        if !options.silent {
            self.trigger("sort", &SetEvent::Sort { set: self.clone() });
        }
        Ok(())
    }

    /// Index at which `record` would be inserted to keep the order.
    pub fn sorted_index(&self, record: &Record) -> Result<usize> {
        let comparator = self.comparator().ok_or_else(|| self.no_comparator())?;
        let members = self.records();
        Ok(members.partition_point(|member| comparator.ordering(member, record) == Ordering::Less))
    }

    /// Sorts silently; a no-op without a comparator.
    pub(crate) fn reorder(&self) {
        let Some(comparator) = self.comparator() else {
            return;
        };
        let mut members = self.records();
        comparator.order(&mut members);
        self.inner.state.borrow_mut().members = members;
        tracing::trace!(set = %self.config().name(), "reordered");
    }

    fn no_comparator(&self) -> SetError {
        SetError::NoComparator {
            set: self.config().name().to_string(),
        }
    }
}
