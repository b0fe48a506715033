//! # Untyped event bus.
//!
//! [`EventBus`] routes JSON-valued [`EventMessage`]s by topic to [`Handler`]s.
//!
//! ## Architecture
//! ```text
//! publish(topic, data)
//!     │
//!     ├──► Registry::snapshot(topic)   (read lock, exact first, then patterns)
//!     │
//!     ├──► tokio::spawn ──► guarded(handler1.handle(msg))
//!     ├──► tokio::spawn ──► guarded(handler2.handle(msg))
//!     └──► tokio::spawn ──► guarded(handlerN.handle(msg))
//!
//! sync_publish(topic, data)
//!     │
//!     └──► for h in snapshot: guarded(h.handle(msg)).await   (in order)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: [`EventBus::publish`] returns once handlers are spawned
//! - **No cross-handler ordering** for `publish`; `sync_publish` runs in snapshot order
//! - **Isolation**: a panicking handler affects neither siblings nor the publisher
//! - **No persistence**: a publish reaches only handlers registered at snapshot time
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{EventBus, EventMessage};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus = EventBus::new();
//!     let id = bus
//!         .subscribe_fn("user.create", |msg: Arc<EventMessage>| async move {
//!             let name: String = msg.unmarshal().unwrap_or_default();
//!             println!("welcome {name}");
//!         })
//!         .expect("non-empty topic");
//!
//!     assert_eq!(bus.sync_publish("user.create", "ada").await, 1);
//!     assert!(bus.unsubscribe("user.create", id));
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use super::builder::BusBuilder;
use super::dispatch::Dispatcher;
use super::registry::{HandlerKey, Registration, Registry, SubscriptionId};
use crate::error::BusError;
use crate::events::{BusAction, EventMessage};
use crate::handlers::{Handler, HandlerFn, HandlerRef, OnceHandler};

/// In-process publish/subscribe bus with opaque (JSON) payloads.
///
/// Cheap to clone: clones share the same registry.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry<dyn Handler>>,
    dispatcher: Arc<Dispatcher>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with [`BusConfig::default`](crate::BusConfig) and no observer.
    pub fn new() -> Self {
        BusBuilder::default().build()
    }

    /// Starts a builder with the default configuration.
    pub fn builder() -> BusBuilder {
        BusBuilder::default()
    }

    pub(crate) fn from_parts(dispatcher: Dispatcher) -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Arc::new(dispatcher),
        }
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Subscribes `handler` to `topic`.
    ///
    /// - Empty topic → ignored, returns `None`
    /// - Same `HandlerRef` already on `topic` → not added again, returns the existing id
    pub fn subscribe(&self, topic: &str, handler: HandlerRef) -> Option<SubscriptionId> {
        let reg = self.registry.subscribe(topic, handler)?;
        Some(self.registered(topic, reg))
    }

    /// Subscribes a closure to `topic`. Every call creates a distinct subscription.
    pub fn subscribe_fn<F, Fut>(&self, topic: &str, f: F) -> Option<SubscriptionId>
    where
        F: Fn(Arc<EventMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(topic, HandlerFn::arc(std::any::type_name::<F>(), f))
    }

    /// Removes subscription `id` from `topic`. Unknown ids are a no-op (`false`).
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let removed = self.registry.unsubscribe(topic, id);
        if removed {
            debug!(bus = %self.dispatcher.name(), topic, %id, "unsubscribed");
        }
        removed
    }

    /// Subscribes `handler` to every topic matched by `pattern` (e.g. `"user.*"`).
    pub fn subscribe_pattern(&self, pattern: &str, handler: HandlerRef) -> Option<SubscriptionId> {
        let reg = self.registry.subscribe_pattern(pattern, handler)?;
        Some(self.registered(pattern, reg))
    }

    /// Closure flavour of [`subscribe_pattern`](Self::subscribe_pattern).
    pub fn subscribe_pattern_fn<F, Fut>(&self, pattern: &str, f: F) -> Option<SubscriptionId>
    where
        F: Fn(Arc<EventMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe_pattern(pattern, HandlerFn::arc(std::any::type_name::<F>(), f))
    }

    /// Removes pattern subscription `id`. Unknown ids are a no-op (`false`).
    pub fn unsubscribe_pattern(&self, pattern: &str, id: SubscriptionId) -> bool {
        let removed = self.registry.unsubscribe_pattern(pattern, id);
        if removed {
            debug!(bus = %self.dispatcher.name(), pattern, %id, "pattern unsubscribed");
        }
        removed
    }

    /// Subscribes `handler` for a single delivery on `topic`.
    ///
    /// The subscription removes itself before `handler` runs. Under concurrent
    /// publishes exactly one of them delivers. The returned id may be used to
    /// cancel the subscription before it fires.
    pub fn once(&self, topic: &str, handler: HandlerRef) -> Option<SubscriptionId> {
        if topic.is_empty() {
            return None;
        }
        let key = HandlerKey::of(&handler);
        let id = self.registry.reserve_id();
        let release = self.registry.release_fn(topic, id);
        let wrapper: HandlerRef = Arc::new(OnceHandler::new(handler, release));
        let reg = self.registry.insert(topic, id, key, wrapper);
        Some(self.registered(topic, reg))
    }

    /// Closure flavour of [`once`](Self::once).
    pub fn once_fn<F, Fut>(&self, topic: &str, f: F) -> Option<SubscriptionId>
    where
        F: Fn(Arc<EventMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.once(topic, HandlerFn::arc(std::any::type_name::<F>(), f))
    }

    fn registered(&self, topic: &str, reg: Registration) -> SubscriptionId {
        if reg.created {
            debug!(bus = %self.dispatcher.name(), topic, id = %reg.id, "subscribed");
            self.dispatcher.notify(topic, BusAction::Subscribe);
        }
        reg.id
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Returns `true` if `topic` has exact-topic subscribers (patterns not counted).
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.registry.has_subscribers(topic)
    }

    /// Exact-topic subscriber counts.
    pub fn stats(&self) -> HashMap<String, usize> {
        self.registry.stats()
    }

    /// Pattern subscriber counts.
    pub fn pattern_stats(&self) -> HashMap<String, usize> {
        self.registry.pattern_stats()
    }

    /// Total number of active subscriptions.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if the bus has no subscriptions at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every subscription. Later publishes reach nobody until new subscriptions arrive.
    pub fn close(&self) {
        self.registry.close();
        debug!(bus = %self.dispatcher.name(), "closed");
    }

    // ---------------------------
    // Delivery
    // ---------------------------

    /// Publishes `data` on `topic` without waiting for handlers.
    ///
    /// Spawns one task per matching handler and returns how many were spawned.
    /// Returns 0 if no tokio runtime is reachable; the observer still sees `Publish { count: 0 }`.
    pub fn publish(&self, topic: &str, data: impl Into<Value>) -> usize {
        let handlers = self.registry.snapshot(topic);
        let msg = Arc::new(EventMessage::new(topic, data.into()));
        let mut count = handlers.len();

        if count > 0 {
            match self.dispatcher.runtime(topic) {
                Some(rt) => spawn_all(&rt, &self.dispatcher, &msg, handlers),
                None => count = 0,
            }
        }

        trace!(bus = %self.dispatcher.name(), topic, id = %msg.id, count, "published");
        self.dispatcher.notify(topic, BusAction::Publish { count });
        count
    }

    /// Serializes `data` and publishes it (see [`publish`](Self::publish)).
    pub fn publish_json<T: Serialize + ?Sized>(&self, topic: &str, data: &T) -> Result<usize, BusError> {
        let value = encode(topic, data)?;
        Ok(self.publish(topic, value))
    }

    /// Publishes `data` on `topic` and runs every matching handler in order.
    ///
    /// Handlers are awaited one after another in the caller's task; the call
    /// completes after the last one finished or panicked. Returns the handler count.
    pub async fn sync_publish(&self, topic: &str, data: impl Into<Value>) -> usize {
        let handlers = self.registry.snapshot(topic);
        let msg = Arc::new(EventMessage::new(topic, data.into()));
        let count = handlers.len();

        trace!(bus = %self.dispatcher.name(), topic, id = %msg.id, count, "sync publish");
        for handler in handlers {
            let fut = handler.handle(Arc::clone(&msg));
            self.dispatcher.guarded(topic, handler.name(), fut).await;
        }

        self.dispatcher.notify(topic, BusAction::Publish { count });
        count
    }

    /// Serializes `data` and publishes it synchronously (see [`sync_publish`](Self::sync_publish)).
    pub async fn sync_publish_json<T: Serialize + ?Sized>(&self, topic: &str, data: &T) -> Result<usize, BusError> {
        let value = encode(topic, data)?;
        Ok(self.sync_publish(topic, value).await)
    }
}

fn spawn_all(rt: &Handle, dispatcher: &Arc<Dispatcher>, msg: &Arc<EventMessage>, handlers: Vec<HandlerRef>) {
    for handler in handlers {
        let dispatcher = Arc::clone(dispatcher);
        let msg = Arc::clone(msg);
        rt.spawn(async move {
            let fut = handler.handle(Arc::clone(&msg));
            dispatcher.guarded(msg.topic(), handler.name(), fut).await;
        });
    }
}

fn encode<T: Serialize + ?Sized>(topic: &str, data: &T) -> Result<Value, BusError> {
    serde_json::to_value(data).map_err(|source| BusError::Encode {
        topic: topic.to_string(),
        source,
    })
}
