//! # Subscription registry.
//!
//! Owns topic → handlers and pattern → handlers mappings for one bus.
//!
//! ## Architecture
//! ```text
//! RwLock<State>
//!   ├─► topics:   HashMap<topic, Vec<Entry { id, key, handler }>>   (insertion order)
//!   └─► patterns: Vec<PatternEntry { pattern, id, key, handler }>   (insertion order)
//!
//! subscribe / unsubscribe / close ─► write lock
//! snapshot / stats / has_subscribers ─► read lock, clone Arcs out, release
//! ```
//!
//! ## Rules
//! - Handler identity is the `Arc` allocation of the caller's handler ([`HandlerKey`]);
//!   one identity per topic (or pattern), wrappers such as once-subscriptions included
//! - Empty topic buckets are removed immediately
//! - Snapshots list exact-topic handlers first, then matching patterns
//! - The lock is never held while a handler runs

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::pattern::topic_matches;

/// Opaque handle of one subscription, used to unsubscribe.
///
/// Ids are unique within a bus instance and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value (for logs).
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Registration {
    pub id: SubscriptionId,
    /// `false` when the handler was already subscribed and `id` is the existing one.
    pub created: bool,
}

/// Identity of a user handler: the address of its `Arc` allocation.
///
/// Vtable pointers are not a stable identity, so only the data pointer counts.
/// The registry keeps the allocation alive while the entry exists, so the
/// address cannot be reused by another handler in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandlerKey(usize);

impl HandlerKey {
    #[inline]
    pub fn of<T: ?Sized>(handler: &Arc<T>) -> Self {
        Self(Arc::as_ptr(handler).cast::<()>() as usize)
    }
}

struct Entry<H: ?Sized> {
    id: SubscriptionId,
    key: HandlerKey,
    handler: Arc<H>,
}

struct PatternEntry<H: ?Sized> {
    pattern: String,
    id: SubscriptionId,
    key: HandlerKey,
    handler: Arc<H>,
}

struct State<H: ?Sized> {
    topics: HashMap<String, Vec<Entry<H>>>,
    patterns: Vec<PatternEntry<H>>,
}

impl<H: ?Sized> Default for State<H> {
    fn default() -> Self {
        Self {
            topics: HashMap::new(),
            patterns: Vec::new(),
        }
    }
}

/// Thread-safe registry of subscriptions for handlers of type `H`.
pub(crate) struct Registry<H: ?Sized> {
    state: RwLock<State<H>>,
    next_id: AtomicU64,
}

impl<H: ?Sized + Send + Sync + 'static> Registry<H> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(State::default()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Allocates an id without registering anything.
    pub fn reserve_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribes `handler` to `topic`. Empty topics are ignored.
    pub fn subscribe(&self, topic: &str, handler: Arc<H>) -> Option<Registration> {
        if topic.is_empty() {
            return None;
        }
        let id = self.reserve_id();
        let key = HandlerKey::of(&handler);
        Some(self.insert(topic, id, key, handler))
    }

    /// Subscribes with a pre-reserved id (see [`reserve_id`](Self::reserve_id)).
    ///
    /// `key` identifies the caller's handler. It differs from `handler` when
    /// `handler` wraps it (once-subscriptions); dedup compares keys only.
    pub fn insert(&self, topic: &str, id: SubscriptionId, key: HandlerKey, handler: Arc<H>) -> Registration {
        let mut state = self.state.write();
        let bucket = state.topics.entry(topic.to_owned()).or_default();
        if let Some(existing) = bucket.iter().find(|e| e.key == key) {
            return Registration {
                id: existing.id,
                created: false,
            };
        }
        bucket.push(Entry { id, key, handler });
        Registration { id, created: true }
    }

    /// Removes subscription `id` from `topic`; returns whether it existed.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut state = self.state.write();
        let Some(bucket) = state.topics.get_mut(topic) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|e| e.id != id);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            state.topics.remove(topic);
        }
        removed
    }

    /// Subscribes `handler` to every topic matched by `pattern`. Empty patterns are ignored.
    pub fn subscribe_pattern(&self, pattern: &str, handler: Arc<H>) -> Option<Registration> {
        if pattern.is_empty() {
            return None;
        }
        let key = HandlerKey::of(&handler);
        let mut state = self.state.write();
        if let Some(existing) = state
            .patterns
            .iter()
            .find(|p| p.pattern == pattern && p.key == key)
        {
            return Some(Registration {
                id: existing.id,
                created: false,
            });
        }
        let id = self.reserve_id();
        state.patterns.push(PatternEntry {
            pattern: pattern.to_owned(),
            id,
            key,
            handler,
        });
        Some(Registration { id, created: true })
    }

    /// Removes pattern subscription `id`; returns whether it existed.
    pub fn unsubscribe_pattern(&self, pattern: &str, id: SubscriptionId) -> bool {
        let mut state = self.state.write();
        match state
            .patterns
            .iter()
            .position(|p| p.id == id && p.pattern == pattern)
        {
            Some(idx) => {
                state.patterns.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of every handler matching `topic`.
    pub fn snapshot(&self, topic: &str) -> Vec<Arc<H>> {
        let state = self.state.read();
        let exact = state.topics.get(topic).map(Vec::as_slice).unwrap_or_default();

        let mut handlers = Vec::with_capacity(exact.len());
        handlers.extend(exact.iter().map(|e| Arc::clone(&e.handler)));
        handlers.extend(
            state
                .patterns
                .iter()
                .filter(|p| topic_matches(&p.pattern, topic))
                .map(|p| Arc::clone(&p.handler)),
        );
        handlers
    }

    /// Returns `true` if `topic` has exact-topic subscribers.
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.state
            .read()
            .topics
            .get(topic)
            .is_some_and(|bucket| !bucket.is_empty())
    }

    /// Exact-topic subscriber counts.
    pub fn stats(&self) -> HashMap<String, usize> {
        let state = self.state.read();
        state
            .topics
            .iter()
            .map(|(topic, bucket)| (topic.clone(), bucket.len()))
            .collect()
    }

    /// Pattern subscriber counts, keyed by pattern string.
    pub fn pattern_stats(&self) -> HashMap<String, usize> {
        let state = self.state.read();
        let mut stats = HashMap::new();
        for p in &state.patterns {
            *stats.entry(p.pattern.clone()).or_insert(0) += 1;
        }
        stats
    }

    /// Total number of active subscriptions (exact + pattern).
    pub fn len(&self) -> usize {
        let state = self.state.read();
        state.topics.values().map(Vec::len).sum::<usize>() + state.patterns.len()
    }

    /// Drops every subscription at once.
    pub fn close(&self) {
        // Old state is dropped after the lock is released.
        let old = std::mem::take(&mut *self.state.write());
        drop(old);
    }

    /// Builds a callback that removes `id` from `topic` if this registry still exists.
    pub fn release_fn(self: &Arc<Self>, topic: &str, id: SubscriptionId) -> impl Fn() + Send + Sync + 'static {
        let registry: Weak<Self> = Arc::downgrade(self);
        let topic = topic.to_owned();
        move || {
            if let Some(registry) = registry.upgrade() {
                registry.unsubscribe(&topic, id);
            }
        }
    }
}
