//! Fragment tracking over an abstract browser location.
//!
//! [`History`] watches the host's location (through the [`Location`] trait),
//! turns it into a fragment relative to the application root and dispatches
//! fragment changes to the most recently registered matching route. It never
//! schedules anything itself: after `start`, the host is told how to observe
//! changes through [`History::observation`] and calls [`History::check_url`]
//! on each native event or polling tick.

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use serde::{Deserialize, Serialize};

use super::{RouteEvent, RoutePattern, RouterError};
use crate::{
    Result,
    constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_ROOT},
    events::{Notifier, Observable},
};

/// The browser-location capability the history drives.
///
/// Implementations use interior mutability; all methods take `&self`.
pub trait Location {
    /// The full URL, including any `#hash`.
    fn href(&self) -> String;

    fn pathname(&self) -> String;

    /// The query string including its leading `?`, or empty.
    fn search(&self) -> String;

    /// Everything after the first `#` of [`href`](Self::href).
    fn hash(&self) -> String {
        self.href()
            .split_once('#')
            .map(|(_, hash)| hash.to_string())
            .unwrap_or_default()
    }

    /// Sets the hash, adding a history entry.
    fn set_hash(&self, hash: &str);

    /// Navigates to `url` without adding a history entry.
    fn replace(&self, url: &str);

    /// Performs a full page load of `url`.
    fn assign(&self, url: &str);

    /// Pushes (or, with `replace`, replaces) a history entry without loading.
    fn push_state(&self, url: &str, replace: bool);

    fn supports_push_state(&self) -> bool;

    fn supports_hash_change(&self) -> bool;
}

/// How the history is configured at `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Application root that fragments are relative to
    pub root: String,
    /// Track the `#hash`; when false and push-state is unavailable, navigation reloads the page
    pub hash_change: bool,
    /// Prefer push-state URLs when the location supports them
    pub push_state: bool,
    /// Start without routing the initial fragment
    pub silent: bool,
    /// Polling interval used when native hash events are unavailable
    pub interval_ms: u64,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            hash_change: true,
            push_state: false,
            silent: false,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// How the host should feed location changes to [`History::check_url`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Not started
    Stopped,
    /// Call on native push-state (popstate) events
    PushState,
    /// Call on native hash-change events
    HashChange,
    /// Call on a timer with this period
    Polling(Duration),
    /// Started, but nothing is observed
    Inactive,
}

/// Options for [`History::navigate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Route the new fragment as well as recording it
    pub trigger: bool,
    /// Replace the current history entry instead of adding one
    pub replace: bool,
}

impl NavigateOptions {
    pub fn trigger() -> Self {
        Self {
            trigger: true,
            replace: false,
        }
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

type Handler = (RoutePattern, Rc<dyn Fn(&str)>);

struct HistoryState {
    started: bool,
    root: String,
    fragment: Option<String>,
    wants_hash_change: bool,
    wants_push_state: bool,
    has_push_state: bool,
    observation: Observation,
    handlers: Vec<Handler>,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            started: false,
            root: DEFAULT_ROOT.to_string(),
            fragment: None,
            wants_hash_change: false,
            wants_push_state: false,
            has_push_state: false,
            observation: Observation::Stopped,
            handlers: Vec::new(),
        }
    }
}

struct HistoryInner {
    location: Rc<dyn Location>,
    events: Notifier<RouteEvent>,
    state: RefCell<HistoryState>,
}

/// Shared handle to the application's fragment history.
#[derive(Clone)]
pub struct History {
    inner: Rc<HistoryInner>,
}

/// Strips one leading `#` or `/` and any trailing whitespace.
fn strip_route(fragment: &str) -> String {
    let fragment = fragment.strip_prefix(['#', '/']).unwrap_or(fragment);
    fragment.trim_end().to_string()
}

/// `"app"`, `"/app"` and `"//app//"` all become `"/app/"`.
fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

impl History {
    pub fn new(location: Rc<dyn Location>) -> Self {
        Self {
            inner: Rc::new(HistoryInner {
                location,
                events: Notifier::new(),
                state: RefCell::new(HistoryState::default()),
            }),
        }
    }

    pub fn location(&self) -> &Rc<dyn Location> {
        &self.inner.location
    }

    pub fn is_started(&self) -> bool {
        self.inner.state.borrow().started
    }

    /// The normalized application root.
    pub fn root(&self) -> String {
        self.inner.state.borrow().root.clone()
    }

    /// The last fragment seen or navigated to.
    pub fn current_fragment(&self) -> Option<String> {
        self.inner.state.borrow().fragment.clone()
    }

    pub fn observation(&self) -> Observation {
        self.inner.state.borrow().observation
    }

    /// Starts tracking the location.
    ///
    /// Returns whether a route handled the initial fragment. A hash-based
    /// client landing on a push-state URL below the root is redirected to the
    /// equivalent `#fragment` URL and `true` is returned without routing;
    /// a push-state client landing on the root with a hash has its URL
    /// rewritten in place.
    pub fn start(&self, options: HistoryOptions) -> Result<bool> {
        let location = &self.inner.location;
        {
            let mut state = self.inner.state.borrow_mut();
            if state.started {
                return Err(RouterError::AlreadyStarted.into());
            }
            state.started = true;
            state.root = normalize_root(&options.root);
            state.wants_hash_change = options.hash_change;
            state.wants_push_state = options.push_state;
            state.has_push_state = options.push_state && location.supports_push_state();
        }

        let fragment = self.fragment(None, false);

        let (root, wants_hash_change, wants_push_state, has_push_state) = {
            let mut state = self.inner.state.borrow_mut();
            state.observation = if state.has_push_state {
                Observation::PushState
            } else if state.wants_hash_change && location.supports_hash_change() {
                Observation::HashChange
            } else if state.wants_hash_change {
                Observation::Polling(Duration::from_millis(options.interval_ms))
            } else {
                Observation::Inactive
            };
            state.fragment = Some(fragment);
            (
                state.root.clone(),
                state.wants_hash_change,
                state.wants_push_state,
                state.has_push_state,
            )
        };
        tracing::info!(root = %root, observation = ?self.observation(), "history started");

        let mut pathname = location.pathname();
        if !pathname.is_empty() && !pathname.ends_with('/') {
            pathname.push('/');
        }
        let at_root = pathname == root;

        if wants_hash_change && wants_push_state && !has_push_state && !at_root {
            let fragment = self.fragment(None, true);
            self.inner.state.borrow_mut().fragment = Some(fragment.clone());
            location.replace(&format!("{root}{}#{fragment}", location.search()));
            return Ok(true);
        } else if wants_push_state && has_push_state && at_root && !location.hash().is_empty() {
            let fragment = strip_route(&location.hash());
            self.inner.state.borrow_mut().fragment = Some(fragment.clone());
            location.push_state(&format!("{root}{fragment}{}", location.search()), true);
        }

        if options.silent {
            return Ok(false);
        }
        Ok(self.load_url(None))
    }

    /// Stops tracking; the history may be started again.
    pub fn stop(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.started = false;
        state.observation = Observation::Stopped;
        tracing::info!("history stopped");
    }

    /// Registers a handler ahead of every existing one.
    pub fn route(&self, pattern: RoutePattern, callback: impl Fn(&str) + 'static) {
        self.inner
            .state
            .borrow_mut()
            .handlers
            .insert(0, (pattern, Rc::new(callback)));
    }

    /// Routes the location's fragment if it changed since last seen.
    pub fn check_url(&self) -> bool {
        let current = self.fragment(None, false);
        if self.inner.state.borrow().fragment.as_deref() == Some(current.as_str()) {
            return false;
        }
        self.load_url(None) || self.load_url(Some(&self.inner.location.hash()))
    }

    /// Records the fragment and runs the first matching handler. Returns whether one matched.
    pub fn load_url(&self, fragment_override: Option<&str>) -> bool {
        let fragment = self.fragment(fragment_override, false);
        let handler = {
            let mut state = self.inner.state.borrow_mut();
            state.fragment = Some(fragment.clone());
            state
                .handlers
                .iter()
                .find(|(pattern, _)| pattern.is_match(&fragment))
                .map(|(_, callback)| callback.clone())
        };
        match handler {
            Some(callback) => {
                tracing::debug!(%fragment, "routing");
                callback(&fragment);
                true
            }
            None => {
                tracing::debug!(%fragment, "no route matched");
                false
            }
        }
    }

    /// Records `fragment` in the browser history, optionally routing it.
    ///
    /// Returns `false` when the history is stopped or the fragment is
    /// unchanged. Without push-state or hash tracking this is a full page load.
    pub fn navigate(&self, fragment: &str, options: NavigateOptions) -> bool {
        if !self.is_started() {
            return false;
        }
        let fragment = self.fragment(Some(fragment), false);
        let (url, has_push_state, wants_hash_change) = {
            let mut state = self.inner.state.borrow_mut();
            if state.fragment.as_deref() == Some(fragment.as_str()) {
                return false;
            }
            state.fragment = Some(fragment.clone());
            (
                format!("{}{fragment}", state.root),
                state.has_push_state,
                state.wants_hash_change,
            )
        };

        let location = &self.inner.location;
        if has_push_state {
            location.push_state(&url, options.replace);
        } else if wants_hash_change {
            self.update_hash(&fragment, options.replace);
        } else {
            location.assign(&url);
            return true;
        }
        if options.trigger {
            self.load_url(Some(&fragment));
        }
        true
    }

    /// The fragment for `fragment_override`, or derived from the location.
    ///
    /// Push-state clients (and forced calls) read the path below the root;
    /// hash clients read the hash.
    pub fn fragment(&self, fragment_override: Option<&str>, force_push_state: bool) -> String {
        let raw = match fragment_override {
            Some(fragment) => fragment.to_string(),
            None => {
                let (use_path, root) = {
                    let state = self.inner.state.borrow();
                    (
                        state.has_push_state || !state.wants_hash_change || force_push_state,
                        state.root.clone(),
                    )
                };
                if use_path {
                    let pathname = self.inner.location.pathname();
                    let root = root.strip_suffix('/').unwrap_or(&root);
                    pathname
                        .strip_prefix(root)
                        .unwrap_or(&pathname)
                        .to_string()
                } else {
                    self.inner.location.hash()
                }
            }
        };
        strip_route(&raw)
    }

    fn update_hash(&self, fragment: &str, replace: bool) {
        let location = &self.inner.location;
        if replace {
            let href = location.href();
            let base = href.split_once('#').map_or(href.as_str(), |(base, _)| base);
            location.replace(&format!("{base}#{fragment}"));
        } else {
            location.set_hash(fragment);
        }
    }
}

impl Observable for History {
    type Event = RouteEvent;

    fn events(&self) -> &Notifier<RouteEvent> {
        &self.inner.events
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_borrow() {
            Ok(state) => f
                .debug_struct("History")
                .field("started", &state.started)
                .field("root", &state.root)
                .field("fragment", &state.fragment)
                .field("observation", &state.observation)
                .field("handlers", &state.handlers.len())
                .finish(),
            Err(_) => f.debug_struct("History").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryLocationState {
    pathname: String,
    search: String,
    hash: String,
    entries: Vec<String>,
    loads: Vec<String>,
}

/// In-process [`Location`] for tests and tools.
///
/// Keeps the current URL parts plus a log of history entries and full page
/// loads. Capabilities can be switched off to exercise the fallbacks.
#[derive(Debug)]
pub struct MemoryLocation {
    origin: String,
    push_state: bool,
    hash_change: bool,
    state: RefCell<MemoryLocationState>,
}

impl MemoryLocation {
    /// Starts at `url` (path, query and hash; an origin is ignored).
    pub fn new(url: &str) -> Self {
        let location = Self {
            origin: "http://localhost".to_string(),
            push_state: true,
            hash_change: true,
            state: RefCell::new(MemoryLocationState::default()),
        };
        location.load(url);
        location
    }

    pub fn with_push_state(mut self, supported: bool) -> Self {
        self.push_state = supported;
        self
    }

    pub fn with_hash_change(mut self, supported: bool) -> Self {
        self.hash_change = supported;
        self
    }

    /// Path, query and hash of the current URL.
    pub fn url(&self) -> String {
        let state = self.state.borrow();
        let mut url = format!("{}{}", state.pathname, state.search);
        if !state.hash.is_empty() {
            url.push('#');
            url.push_str(&state.hash);
        }
        url
    }

    /// Moves to `url` as if the user followed a link within the page.
    pub fn visit(&self, url: &str) {
        self.load(url);
        let current = self.url();
        self.state.borrow_mut().entries.push(current);
    }

    /// History entries added so far.
    pub fn entries(&self) -> Vec<String> {
        self.state.borrow().entries.clone()
    }

    /// Full page loads and replacements requested so far.
    pub fn loads(&self) -> Vec<String> {
        self.state.borrow().loads.clone()
    }

    fn load(&self, url: &str) {
        let url = url.strip_prefix(self.origin.as_str()).unwrap_or(url);
        let (rest, hash) = url.split_once('#').unwrap_or((url, ""));
        let (path, search) = match rest.find('?') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        let mut state = self.state.borrow_mut();
        state.pathname = if path.is_empty() { "/".to_string() } else { path.to_string() };
        state.search = search.to_string();
        state.hash = hash.to_string();
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> String {
        format!("{}{}", self.origin, self.url())
    }

    fn pathname(&self) -> String {
        self.state.borrow().pathname.clone()
    }

    fn search(&self) -> String {
        self.state.borrow().search.clone()
    }

    fn set_hash(&self, hash: &str) {
        self.state.borrow_mut().hash = hash.to_string();
        let current = self.url();
        self.state.borrow_mut().entries.push(current);
    }

    fn replace(&self, url: &str) {
        self.load(url);
        self.state.borrow_mut().loads.push(url.to_string());
    }

    fn assign(&self, url: &str) {
        self.load(url);
        let mut state = self.state.borrow_mut();
        state.loads.push(url.to_string());
        state.entries.push(url.to_string());
    }

    fn push_state(&self, url: &str, replace: bool) {
        self.load(url);
        if !replace {
            let current = self.url();
            self.state.borrow_mut().entries.push(current);
        }
    }

    fn supports_push_state(&self) -> bool {
        self.push_state
    }

    fn supports_hash_change(&self) -> bool {
        self.hash_change
    }
}
