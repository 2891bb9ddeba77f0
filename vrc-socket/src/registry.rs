//! Subscriber registry keyed by event tag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use vrc_core::constants::WILDCARD_EVENT;

use crate::events::RawEvent;

/// Callback invoked with every matching event.
pub type EventHandler = Arc<dyn Fn(&RawEvent) + Send + Sync>;

/// A registered callback.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    handler: EventHandler,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn invoke(&self, event: &RawEvent) {
        (self.handler)(event)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Identifies one registration; pass it to [`HandlerRegistry::unregister`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    tag: String,
    id: u64,
}

impl SubscriptionHandle {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Map from tag (or `"*"`) to an insertion-ordered subscriber list.
///
/// Each list is an immutable snapshot. Writers build a new slice and swap it
/// in under the write lock; readers clone the `Arc` under a short read lock.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<[Subscription]>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the subscribers of `tag`.
    pub fn register(&self, tag: &str, handler: EventHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Subscription { id, handler };

        let mut handlers = self.handlers.write();
        let list: Arc<[Subscription]> = match handlers.get(tag) {
            Some(existing) => existing
                .iter()
                .cloned()
                .chain(std::iter::once(subscription))
                .collect(),
            None => Arc::from(vec![subscription]),
        };
        handlers.insert(tag.to_string(), list);

        SubscriptionHandle {
            tag: tag.to_string(),
            id,
        }
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn unregister(&self, handle: &SubscriptionHandle) -> bool {
        let mut handlers = self.handlers.write();
        let Some(existing) = handlers.get(&handle.tag) else {
            return false;
        };
        if !existing.iter().any(|s| s.id == handle.id) {
            return false;
        }

        let remaining: Vec<Subscription> = existing
            .iter()
            .filter(|s| s.id != handle.id)
            .cloned()
            .collect();
        if remaining.is_empty() {
            handlers.remove(&handle.tag);
        } else {
            handlers.insert(handle.tag.clone(), Arc::from(remaining));
        }
        true
    }

    /// Snapshot of the subscribers registered under exactly `tag`.
    pub fn lookup(&self, tag: &str) -> Arc<[Subscription]> {
        self.handlers
            .read()
            .get(tag)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Exact-tag subscribers followed by wildcard subscribers.
    pub fn matching(&self, tag: &str) -> Vec<Subscription> {
        let (exact, wildcard) = {
            let handlers = self.handlers.read();
            (
                handlers.get(tag).cloned(),
                handlers.get(WILDCARD_EVENT).cloned(),
            )
        };

        let mut out = Vec::new();
        if tag != WILDCARD_EVENT {
            if let Some(exact) = exact {
                out.extend(exact.iter().cloned());
            }
        }
        if let Some(wildcard) = wildcard {
            out.extend(wildcard.iter().cloned());
        }
        out
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
