//! In-process transport.
//!
//! [`MemoryTransport`] records every request it is asked to make and holds the
//! outcome callbacks until the host answers. This is what tests and the CLI
//! use in place of a network client; answering a request runs the same
//! success and error paths a real response would.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
};

use super::{HttpRequest, SyncConfig, SyncOptions, SyncTarget, Transport, TransportError, Verb};
use crate::Result;

/// A request waiting for its outcome.
pub struct PendingSync {
    pub verb: Verb,
    pub target: SyncTarget,
    pub request: HttpRequest,
    options: SyncOptions,
}

impl PendingSync {
    /// Completes the request successfully with `payload`.
    pub fn succeed(self, payload: serde_json::Value) {
        self.options.complete(Ok(payload));
    }

    /// Completes the request with a failure.
    pub fn fail(self, error: TransportError) {
        self.options.complete(Err(error));
    }
}

impl fmt::Debug for PendingSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSync")
            .field("verb", &self.verb)
            .field("request", &self.request)
            .finish()
    }
}

/// Transport that queues requests until they are answered in order.
#[derive(Default)]
pub struct MemoryTransport {
    config: SyncConfig,
    pending: RefCell<VecDeque<PendingSync>>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("config", &self.config)
            .field("pending", &self.pending.borrow().len())
            .field("sent", &self.sent.borrow().len())
            .finish()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Number of requests awaiting an answer.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Every request made so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.borrow().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.sent.borrow().last().cloned()
    }

    /// Takes the oldest unanswered request.
    pub fn next_pending(&self) -> Option<PendingSync> {
        self.pending.borrow_mut().pop_front()
    }

    /// Answers the oldest unanswered request successfully. Returns whether one was waiting.
    pub fn respond(&self, payload: serde_json::Value) -> bool {
        match self.next_pending() {
            Some(pending) => {
                pending.succeed(payload);
                true
            }
            None => false,
        }
    }

    /// Fails the oldest unanswered request. Returns whether one was waiting.
    pub fn fail(&self, error: TransportError) -> bool {
        match self.next_pending() {
            Some(pending) => {
                pending.fail(error);
                true
            }
            None => false,
        }
    }
}

impl Transport for MemoryTransport {
    fn sync(&self, verb: Verb, target: SyncTarget, options: SyncOptions) -> Result<()> {
        let request = HttpRequest::build(verb, &target, &options, self.config)?;
        tracing::debug!(%verb, %request, target = %target.describe(), "queued request");
        self.sent.borrow_mut().push(request.clone());
        self.pending.borrow_mut().push_back(PendingSync {
            verb,
            target,
            request,
            options,
        });
        Ok(())
    }
}
