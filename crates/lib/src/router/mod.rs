//! URL-fragment routing.
//!
//! A [`Router`] binds route patterns to names and callbacks on a shared
//! [`History`]. When the history routes a fragment to one of those bindings
//! the router runs the callback with the decoded parameters, then emits
//! `"route:<name>"` and `"route"` on itself and `"route"` on the history.

mod errors;
mod history;
mod pattern;

use std::{
    fmt,
    rc::{Rc, Weak},
};

pub use errors::RouterError;
pub use history::{History, HistoryOptions, Location, MemoryLocation, NavigateOptions, Observation};
pub use pattern::RoutePattern;

use crate::{
    Result,
    events::{Notifier, Observable},
};

/// Payload of the `"route"` and `"route:<name>"` events.
#[derive(Debug, Clone)]
pub struct RouteEvent {
    pub router: Router,
    pub name: String,
    /// Decoded captures; absent optional parts are `None`
    pub params: Vec<Option<String>>,
    pub fragment: String,
}

struct RouterInner {
    history: History,
    events: Notifier<RouteEvent>,
}

/// A set of named routes bound to a [`History`].
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    pub fn new(history: History) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                history,
                events: Notifier::new(),
            }),
        }
    }

    /// Creates a router and binds `(pattern, name)` pairs.
    ///
    /// The first listed route takes priority over later ones.
    pub fn with_routes<'a>(
        history: History,
        routes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let router = Self::new(history);
        let routes: Vec<(&str, &str)> = routes.into_iter().collect();
        for (pattern, name) in routes.into_iter().rev() {
            router.route(pattern, name, |_| {})?;
        }
        Ok(router)
    }

    pub fn history(&self) -> &History {
        &self.inner.history
    }

    /// Compiles `pattern` and binds it ahead of every existing route.
    pub fn route(
        &self,
        pattern: &str,
        name: &str,
        callback: impl Fn(&[Option<String>]) + 'static,
    ) -> Result<&Self> {
        let pattern = RoutePattern::compile(pattern)?;
        Ok(self.route_with(pattern, name, callback))
    }

    /// Binds an already compiled pattern.
    pub fn route_with(
        &self,
        pattern: RoutePattern,
        name: &str,
        callback: impl Fn(&[Option<String>]) + 'static,
    ) -> &Self {
        let router: Weak<RouterInner> = Rc::downgrade(&self.inner);
        let name = name.to_string();
        let matcher = pattern.clone();
        self.inner.history.route(pattern, move |fragment| {
            let Some(inner) = router.upgrade() else {
                return;
            };
            let router = Router { inner };
            let params = matcher.extract(fragment).unwrap_or_default();
            callback(&params);

            let event = RouteEvent {
                router: router.clone(),
                name: name.clone(),
                params,
                fragment: fragment.to_string(),
            };
            router.trigger(&format!("route:{name}"), &event);
            router.trigger("route", &event);
            router.inner.history.trigger("route", &event);
        });
        self
    }

    /// See [`History::navigate`].
    pub fn navigate(&self, fragment: &str, options: NavigateOptions) -> bool {
        self.inner.history.navigate(fragment, options)
    }

    pub fn ptr_eq(&self, other: &Router) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Observable for Router {
    type Event = RouteEvent;

    fn events(&self) -> &Notifier<RouteEvent> {
        &self.inner.events
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("events", &self.inner.events.id())
            .finish_non_exhaustive()
    }
}
