//! Publish/subscribe capability shared by records, record sets, routers and views.
//!
//! A [`Notifier`] keeps, per event name, an ordered list of subscriptions and
//! dispatches synchronously in subscription order. Subscribing to
//! [`ALL`](crate::constants::ALL) receives every event; callbacks always get
//! the real event name as their first argument.
//!
//! Subscription lists are copy-on-write: `on`/`off` replace the list for a name
//! instead of editing it, so a dispatch that is already running keeps walking
//! the snapshot it started with. A callback added during dispatch does not see
//! the in-flight event.
//!
//! A notifier also tracks the sources it listens to (`listen_to`), so that
//! `stop_listening_all` can release every subscription it holds elsewhere
//! without the caller remembering the sources.
//!
//! # Example
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use vertebra::events::{Callback, Notifier};
//!
//! let notifier: Notifier<i32> = Notifier::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! notifier.on("ping pong", Callback::new(move |name, n: &i32| {
//!     log.borrow_mut().push(format!("{name}:{n}"));
//! }));
//!
//! notifier.trigger("ping", &1);
//! notifier.trigger("pong", &2);
//! assert_eq!(*seen.borrow(), vec!["ping:1", "pong:2"]);
//! ```

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::constants::ALL;

/// Identity of a notifier, used as the subscription context for inverse-controlled listening.
pub type ListenerId = u64;

static NEXT_NOTIFIER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// A shareable event callback.
///
/// Callbacks compare by identity: `off` removes the subscriptions created from
/// clones of the same `Callback`.
pub struct Callback<E>(Rc<dyn Fn(&str, &E)>);

impl<E> Callback<E> {
    /// Wraps a closure receiving the event name and payload.
    pub fn new(f: impl Fn(&str, &E) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Whether both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Callback<E>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Invokes the callback.
    pub fn call(&self, name: &str, payload: &E) {
        (self.0)(name, payload)
    }
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<E> fmt::Debug for Callback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

struct Subscription<E> {
    serial: u64,
    callback: Callback<E>,
    /// The caller's callback when `callback` is a `once` wrapper.
    original: Option<Callback<E>>,
    context: Option<ListenerId>,
}

impl<E> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            serial: self.serial,
            callback: self.callback.clone(),
            original: self.original.clone(),
            context: self.context,
        }
    }
}

impl<E> Subscription<E> {
    fn matches(&self, callback: Option<&Callback<E>>, context: Option<ListenerId>) -> bool {
        let callback_matches = callback.is_none_or(|cb| {
            self.callback.ptr_eq(cb) || self.original.as_ref().is_some_and(|o| o.ptr_eq(cb))
        });
        let context_matches = context.is_none_or(|c| self.context == Some(c));
        callback_matches && context_matches
    }
}

/// A source this notifier listens to, type-erased so sources of any payload
/// type can share one table.
struct Listening {
    release: Box<dyn Fn(ListenerId)>,
}

struct Registry<E> {
    handlers: HashMap<String, Rc<Vec<Subscription<E>>>>,
    listening: HashMap<ListenerId, Listening>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            listening: HashMap::new(),
        }
    }
}

impl<E> Registry<E> {
    fn push(&mut self, name: &str, subscription: Subscription<E>) {
        let list = self.handlers.entry(name.to_string()).or_default();
        Rc::make_mut(list).push(subscription);
    }

    fn remove(&mut self, name: &str, callback: Option<&Callback<E>>, context: Option<ListenerId>) {
        let Some(list) = self.handlers.get(name) else {
            return;
        };
        let retain: Vec<Subscription<E>> = if callback.is_some() || context.is_some() {
            list.iter()
                .filter(|sub| !sub.matches(callback, context))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        if retain.is_empty() {
            self.handlers.remove(name);
        } else {
            self.handlers.insert(name.to_string(), Rc::new(retain));
        }
    }

    fn remove_serial(&mut self, name: &str, serial: u64) {
        let Some(list) = self.handlers.get(name) else {
            return;
        };
        let retain: Vec<Subscription<E>> = list
            .iter()
            .filter(|sub| sub.serial != serial)
            .cloned()
            .collect();
        if retain.is_empty() {
            self.handlers.remove(name);
        } else {
            self.handlers.insert(name.to_string(), Rc::new(retain));
        }
    }
}

/// Splits a space-separated list of event names.
fn event_names(names: &str) -> impl Iterator<Item = &str> {
    names.split_whitespace()
}

/// Publish/subscribe hub for payloads of type `E`.
///
/// Cloning a `Notifier` yields another handle to the same subscriptions.
pub struct Notifier<E: 'static> {
    id: ListenerId,
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: 'static> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E: 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Notifier")
            .field("id", &self.id)
            .field("events", &registry.handlers.len())
            .field("listening", &registry.listening.len())
            .finish()
    }
}

impl<E: 'static> Notifier<E> {
    /// Creates a notifier with no subscriptions.
    pub fn new() -> Self {
        Self {
            id: NEXT_NOTIFIER_ID.fetch_add(1, Ordering::Relaxed),
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    /// Process-unique identity of this notifier.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Subscribes `callback` to each of the space-separated `names`.
    pub fn on(&self, names: &str, callback: Callback<E>) -> &Self {
        self.on_with_context(names, callback, None)
    }

    /// Subscribes with an explicit context, which `off` can later filter on.
    pub fn on_with_context(
        &self,
        names: &str,
        callback: Callback<E>,
        context: Option<ListenerId>,
    ) -> &Self {
        let mut registry = self.registry.borrow_mut();
        for name in event_names(names) {
            registry.push(
                name,
                Subscription {
                    serial: NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed),
                    callback: callback.clone(),
                    original: None,
                    context,
                },
            );
        }
        self
    }

    /// Subscribes each `(names, callback)` pair of an event map.
    pub fn on_map<'a>(&self, map: impl IntoIterator<Item = (&'a str, Callback<E>)>) -> &Self {
        for (names, callback) in map {
            self.on(names, callback);
        }
        self
    }

    /// Like [`on`](Self::on), but each subscription removes itself after its first call.
    ///
    /// `off` given the original `callback` still removes the pending subscription.
    pub fn once(&self, names: &str, callback: Callback<E>) -> &Self {
        self.once_with_context(names, callback, None)
    }

    /// [`once`](Self::once) with an explicit context.
    pub fn once_with_context(
        &self,
        names: &str,
        callback: Callback<E>,
        context: Option<ListenerId>,
    ) -> &Self {
        for name in event_names(names) {
            let serial = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
            let fired = Cell::new(false);
            let registry: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
            let bound_name = name.to_string();
            let original = callback.clone();
            let wrapper = Callback::new(move |event: &str, payload: &E| {
                if fired.replace(true) {
                    return;
                }
                if let Some(registry) = registry.upgrade() {
                    registry.borrow_mut().remove_serial(&bound_name, serial);
                }
                original.call(event, payload);
            });
            self.registry.borrow_mut().push(
                name,
                Subscription {
                    serial,
                    callback: wrapper,
                    original: Some(callback.clone()),
                    context,
                },
            );
        }
        self
    }

    /// Removes subscriptions matching every given filter.
    ///
    /// With no filters at all, every subscription is removed. `names` may hold
    /// several space-separated names; when absent, all names are considered.
    pub fn off(
        &self,
        names: Option<&str>,
        callback: Option<&Callback<E>>,
        context: Option<ListenerId>,
    ) -> &Self {
        let mut registry = self.registry.borrow_mut();
        if names.is_none() && callback.is_none() && context.is_none() {
            registry.handlers.clear();
            return self;
        }
        let targets: Vec<String> = match names {
            Some(names) => event_names(names).map(str::to_string).collect(),
            None => registry.handlers.keys().cloned().collect(),
        };
        for name in targets {
            registry.remove(&name, callback, context);
        }
        self
    }

    /// Removes every subscription.
    pub fn off_all(&self) -> &Self {
        self.off(None, None, None)
    }

    /// Dispatches `payload` to the subscribers of each space-separated name, then to `all`.
    ///
    /// Dispatch is synchronous and unguarded: a panicking callback aborts the
    /// remaining callbacks of that dispatch.
    pub fn trigger(&self, names: &str, payload: &E) -> &Self {
        for name in event_names(names) {
            let (named, all) = {
                let registry = self.registry.borrow();
                if registry.handlers.is_empty() {
                    return self;
                }
                let named = if name == ALL {
                    None
                } else {
                    registry.handlers.get(name).cloned()
                };
                (named, registry.handlers.get(ALL).cloned())
            };
            tracing::trace!(notifier = self.id, event = name, "dispatch");
            if let Some(list) = named {
                for subscription in list.iter() {
                    subscription.callback.call(name, payload);
                }
            }
            if let Some(list) = all {
                for subscription in list.iter() {
                    subscription.callback.call(name, payload);
                }
            }
        }
        self
    }

    /// Whether anything is subscribed to `name`, or to anything at all when `None`.
    pub fn has_listeners(&self, name: Option<&str>) -> bool {
        let registry = self.registry.borrow();
        match name {
            Some(name) => registry.handlers.contains_key(name),
            None => !registry.handlers.is_empty(),
        }
    }

    /// Number of subscriptions bound to `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(name)
            .map_or(0, |list| list.len())
    }

    /// Subscribes to `source` on behalf of this notifier and remembers the relationship.
    pub fn listen_to<S: 'static>(
        &self,
        source: &Notifier<S>,
        names: &str,
        callback: Callback<S>,
    ) -> &Self {
        self.track(source);
        source.on_with_context(names, callback, Some(self.id));
        self
    }

    /// [`listen_to`](Self::listen_to) with a self-removing subscription.
    pub fn listen_to_once<S: 'static>(
        &self,
        source: &Notifier<S>,
        names: &str,
        callback: Callback<S>,
    ) -> &Self {
        self.track(source);
        source.once_with_context(names, callback, Some(self.id));
        self
    }

    /// Removes subscriptions this notifier holds on `source`, narrowed by name and callback.
    ///
    /// Without filters the relationship is forgotten entirely.
    pub fn stop_listening<S: 'static>(
        &self,
        source: &Notifier<S>,
        names: Option<&str>,
        callback: Option<&Callback<S>>,
    ) -> &Self {
        source.off(names, callback, Some(self.id));
        if names.is_none() && callback.is_none() {
            self.registry.borrow_mut().listening.remove(&source.id);
        }
        self
    }

    /// Releases every subscription this notifier holds on any source.
    pub fn stop_listening_all(&self) -> &Self {
        let listening: Vec<Listening> = {
            let mut registry = self.registry.borrow_mut();
            registry.listening.drain().map(|(_, entry)| entry).collect()
        };
        for entry in listening {
            (entry.release)(self.id);
        }
        self
    }

    /// Whether this notifier currently tracks a subscription on `source`.
    pub fn is_listening_to<S: 'static>(&self, source: &Notifier<S>) -> bool {
        self.registry.borrow().listening.contains_key(&source.id)
    }

    fn track<S: 'static>(&self, source: &Notifier<S>) {
        let weak = Rc::downgrade(&source.registry);
        let source_id = source.id;
        self.registry
            .borrow_mut()
            .listening
            .entry(source_id)
            .or_insert_with(|| Listening {
                release: Box::new(move |context| {
                    if let Some(registry) = weak.upgrade() {
                        let names: Vec<String> = registry.borrow().handlers.keys().cloned().collect();
                        let mut registry = registry.borrow_mut();
                        for name in names {
                            registry.remove(&name, None, Some(context));
                        }
                    }
                }),
            });
    }
}

/// Entities that expose a [`Notifier`].
///
/// Records, record sets, routers, histories and views implement this by
/// composition, which gives them the same event operations.
pub trait Observable {
    /// Payload carried by this entity's events.
    type Event: 'static;

    /// The entity's notifier.
    fn events(&self) -> &Notifier<Self::Event>;

    /// See [`Notifier::on`].
    fn on(&self, names: &str, callback: Callback<Self::Event>) -> &Self {
        self.events().on(names, callback);
        self
    }

    /// See [`Notifier::once`].
    fn once(&self, names: &str, callback: Callback<Self::Event>) -> &Self {
        self.events().once(names, callback);
        self
    }

    /// See [`Notifier::off`].
    fn off(
        &self,
        names: Option<&str>,
        callback: Option<&Callback<Self::Event>>,
        context: Option<ListenerId>,
    ) -> &Self {
        self.events().off(names, callback, context);
        self
    }

    /// See [`Notifier::trigger`].
    fn trigger(&self, names: &str, payload: &Self::Event) -> &Self {
        self.events().trigger(names, payload);
        self
    }

    /// See [`Notifier::listen_to`].
    fn listen_to<O: Observable>(
        &self,
        source: &O,
        names: &str,
        callback: Callback<O::Event>,
    ) -> &Self {
        self.events().listen_to(source.events(), names, callback);
        self
    }

    /// See [`Notifier::listen_to_once`].
    fn listen_to_once<O: Observable>(
        &self,
        source: &O,
        names: &str,
        callback: Callback<O::Event>,
    ) -> &Self {
        self.events().listen_to_once(source.events(), names, callback);
        self
    }

    /// See [`Notifier::stop_listening`].
    fn stop_listening<O: Observable>(
        &self,
        source: &O,
        names: Option<&str>,
        callback: Option<&Callback<O::Event>>,
    ) -> &Self {
        self.events().stop_listening(source.events(), names, callback);
        self
    }

    /// See [`Notifier::stop_listening_all`].
    fn stop_listening_all(&self) -> &Self {
        self.events().stop_listening_all();
        self
    }
}

impl<E: 'static> Observable for Notifier<E> {
    type Event = E;

    fn events(&self) -> &Notifier<E> {
        self
    }
}
