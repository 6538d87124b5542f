//! Generic event publisher composed by the bridge and every state machine.

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tracing::error;

use crate::lock;

/// An event whose subscribers are keyed by a discriminant (its kind).
pub trait Event: fmt::Debug {
    type Kind: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Subscription<E: Event> {
    id: HandlerId,
    kind: E::Kind,
    handler: Handler<E>,
}

pub struct Publisher<E: Event> {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription<E>>>,
}

impl<E: Event> Default for Publisher<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscriptions: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Event> Publisher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: E::Kind, handler: F) -> HandlerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscriptions).push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Returns whether a subscription was removed.
    pub fn off(&self, kind: E::Kind, id: HandlerId) -> bool {
        let mut subscriptions = lock(&self.subscriptions);
        let before = subscriptions.len();
        subscriptions.retain(|sub| !(sub.id == id && sub.kind == kind));
        subscriptions.len() != before
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        lock(&self.subscriptions)
            .iter()
            .filter(|sub| sub.kind == kind)
            .count()
    }

    /// Handlers registered for `kind`, in registration order, detached from
    /// the live table.
    pub fn snapshot(&self, kind: E::Kind) -> Vec<Handler<E>> {
        lock(&self.subscriptions)
            .iter()
            .filter(|sub| sub.kind == kind)
            .map(|sub| Arc::clone(&sub.handler))
            .collect()
    }

    /// Runs `adapt` once per handler in the snapshot. A panicking handler is
    /// logged and the remaining handlers still run.
    pub fn call_each<A>(&self, kind: E::Kind, mut adapt: A)
    where
        A: FnMut(&Handler<E>),
    {
        for handler in self.snapshot(kind) {
            if catch_unwind(AssertUnwindSafe(|| adapt(&handler))).is_err() {
                error!(event = ?kind, "event handler panicked; continuing dispatch");
            }
        }
    }

    pub fn emit(&self, event: &E) {
        self.call_each(event.kind(), |handler| handler(event));
    }
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
