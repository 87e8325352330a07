//! Views: event wiring between an element host and the data layer.
//!
//! Rendering is left to the application. A [`View`] only owns the plumbing:
//! a [`Notifier`] for its own events and the relationships it listens to, an
//! optional [`Record`] and [`RecordSet`], and an [`ElementHost`] that
//! delegated DOM-style events are bound through.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    Record, RecordSet,
    constants::VIEW_ID_PREFIX,
    events::{Notifier, Observable},
    record::unique_id,
};

/// Listener the host invokes when a bound event fires.
pub type HostListener = Rc<dyn Fn(&serde_json::Value)>;

/// Handler in a view's event map; receives the view and the host's event payload.
pub type ViewHandler = Rc<dyn Fn(&View, &serde_json::Value)>;

/// The DOM-like element a view is attached to.
pub trait ElementHost {
    /// Binds `listener` for `event`, on the element itself or, with a
    /// selector, on matching descendants. `namespace` tags the binding.
    fn bind(&self, event: &str, selector: Option<&str>, namespace: &str, listener: HostListener);

    /// Drops every binding tagged with `namespace`.
    fn unbind_namespace(&self, namespace: &str);

    /// Removes the element from its document.
    fn detach(&self);
}

struct ViewInner {
    cid: String,
    events: Notifier<serde_json::Value>,
    element: RefCell<Rc<dyn ElementHost>>,
    record: Option<Record>,
    collection: Option<RecordSet>,
    handlers: RefCell<Vec<(String, ViewHandler)>>,
}

/// Shared handle to a view.
#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

/// Splits `"click .button"` into the event name and an optional selector.
fn split_event_key(key: &str) -> Option<(&str, Option<&str>)> {
    let key = key.trim_start();
    let (event, selector) = key.split_once(char::is_whitespace).unwrap_or((key, ""));
    if event.is_empty() {
        return None;
    }
    let selector = selector.trim_start();
    Some((event, (!selector.is_empty()).then_some(selector)))
}

impl View {
    /// Creates a view on `element` with its event map delegated.
    pub fn new(
        element: Rc<dyn ElementHost>,
        record: Option<Record>,
        collection: Option<RecordSet>,
        handlers: impl IntoIterator<Item = (String, ViewHandler)>,
    ) -> Self {
        let view = Self {
            inner: Rc::new(ViewInner {
                cid: unique_id(VIEW_ID_PREFIX),
                events: Notifier::new(),
                element: RefCell::new(element),
                record,
                collection,
                handlers: RefCell::new(handlers.into_iter().collect()),
            }),
        };
        view.delegate_events(None);
        view
    }

    pub fn cid(&self) -> &str {
        &self.inner.cid
    }

    pub fn record(&self) -> Option<&Record> {
        self.inner.record.as_ref()
    }

    pub fn collection(&self) -> Option<&RecordSet> {
        self.inner.collection.as_ref()
    }

    pub fn element(&self) -> Rc<dyn ElementHost> {
        self.inner.element.borrow().clone()
    }

    /// Namespace tagging every binding this view makes on its element.
    pub fn namespace(&self) -> String {
        format!(".delegateEvents{}", self.inner.cid)
    }

    /// Rebinds the event map through the element host.
    ///
    /// With `handlers`, the view's map is replaced first. Existing bindings
    /// are always dropped before binding. Keys are `"<event> <selector>"`;
    /// without a selector the handler is bound on the element itself.
    pub fn delegate_events(&self, handlers: Option<Vec<(String, ViewHandler)>>) {
        if let Some(handlers) = handlers {
            *self.inner.handlers.borrow_mut() = handlers;
        }
        self.undelegate_events();

        let element = self.element();
        let namespace = self.namespace();
        let handlers = self.inner.handlers.borrow().clone();
        for (key, handler) in handlers {
            let Some((event, selector)) = split_event_key(&key) else {
                tracing::warn!(view = %self.inner.cid, key = %key, "ignoring malformed event key");
                continue;
            };
            let view: Weak<ViewInner> = Rc::downgrade(&self.inner);
            let listener: HostListener = Rc::new(move |payload: &serde_json::Value| {
                if let Some(inner) = view.upgrade() {
                    handler(&View { inner }, payload);
                }
            });
            element.bind(event, selector, &namespace, listener);
        }
    }

    /// Drops every binding made by [`delegate_events`](Self::delegate_events).
    pub fn undelegate_events(&self) {
        self.element().unbind_namespace(&self.namespace());
    }

    /// Moves the view to another element, re-delegating when `delegate` is set.
    pub fn set_element(&self, element: Rc<dyn ElementHost>, delegate: bool) {
        self.undelegate_events();
        *self.inner.element.borrow_mut() = element;
        if delegate {
            self.delegate_events(None);
        }
    }

    /// Detaches the element and releases everything this view listens to.
    pub fn remove(&self) {
        self.element().detach();
        self.stop_listening_all();
    }
}

impl Observable for View {
    type Event = serde_json::Value;

    fn events(&self) -> &Notifier<serde_json::Value> {
        &self.inner.events
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("cid", &self.inner.cid)
            .field("record", &self.inner.record.as_ref().map(Record::cid))
            .field("handlers", &self.inner.handlers.borrow().len())
            .finish_non_exhaustive()
    }
}
