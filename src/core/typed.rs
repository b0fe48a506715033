//! # Typed, token-aware event bus.
//!
//! [`TypedBus<T>`] carries one payload type per instance and hands every handler
//! a [`CancellationToken`] together with its own clone of the payload.
//!
//! ## Timeout semantics
//!
//! ```text
//! publish(ctx, topic, data, timeout = 0)
//!     └──► spawn ──► handler.handle(ctx.clone(), data)         (caller's token)
//!
//! publish(ctx, topic, data, timeout = d)
//!     └──► spawn ──► child = ctx.child_token()
//!                    ├─► handler.handle(child, data)
//!                    ├─► after d: child.cancel()               (handler keeps running)
//!                    └─► handler returned: child.cancel()      (drop guard)
//! ```
//!
//! ## Rules
//! - Each handler invocation gets an **independent** deadline
//! - A deadline cancels only that invocation's child token, never `ctx`
//! - Cancelling `ctx` propagates to every child token
//! - Handlers decide how to react to cancellation; nothing is aborted
//! - The observer sees `Publish { count }` once per publish, after scheduling

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::builder::BusBuilder;
use super::dispatch::Dispatcher;
use super::registry::{HandlerKey, Registration, Registry, SubscriptionId};
use crate::events::BusAction;
use crate::handlers::{OnceHandler, TypedHandler, TypedHandlerFn, TypedHandlerRef};

/// Publish/subscribe bus specialised to payloads of type `T`.
///
/// Cheap to clone: clones share the same registry.
pub struct TypedBus<T: Clone + Send + Sync + 'static> {
    registry: Arc<Registry<dyn TypedHandler<T>>>,
    dispatcher: Arc<Dispatcher>,
    default_timeout: Option<Duration>,
    _payload: PhantomData<fn(T)>,
}

impl<T: Clone + Send + Sync + 'static> Clone for TypedBus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            dispatcher: Arc::clone(&self.dispatcher),
            default_timeout: self.default_timeout,
            _payload: PhantomData,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for TypedBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> TypedBus<T> {
    /// Creates a typed bus with the default configuration and no observer.
    pub fn new() -> Self {
        BusBuilder::default().build_typed()
    }

    /// Starts a builder with the default configuration; finish with [`BusBuilder::build_typed`].
    pub fn builder() -> BusBuilder {
        BusBuilder::default()
    }

    pub(crate) fn from_parts(dispatcher: Dispatcher, default_timeout: Option<Duration>) -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Arc::new(dispatcher),
            default_timeout,
            _payload: PhantomData,
        }
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Subscribes `handler` to `topic`; same rules as [`EventBus::subscribe`](crate::EventBus::subscribe).
    ///
    /// A newly created subscription is reported to the observer as `Subscribe`.
    pub fn subscribe(&self, topic: &str, handler: TypedHandlerRef<T>) -> Option<SubscriptionId> {
        let reg = self.registry.subscribe(topic, handler)?;
        Some(self.registered(topic, reg))
    }

    /// Subscribes a closure to `topic`. Every call creates a distinct subscription.
    pub fn subscribe_fn<F, Fut>(&self, topic: &str, f: F) -> Option<SubscriptionId>
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(topic, TypedHandlerFn::arc(std::any::type_name::<F>(), f))
    }

    /// Removes subscription `id` from `topic`.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let removed = self.registry.unsubscribe(topic, id);
        if removed {
            debug!(bus = %self.dispatcher.name(), topic, %id, "unsubscribed");
        }
        removed
    }

    /// Subscribes `handler` to every topic matched by `pattern`.
    pub fn subscribe_pattern(&self, pattern: &str, handler: TypedHandlerRef<T>) -> Option<SubscriptionId> {
        let reg = self.registry.subscribe_pattern(pattern, handler)?;
        Some(self.registered(pattern, reg))
    }

    /// Closure flavour of [`subscribe_pattern`](Self::subscribe_pattern).
    pub fn subscribe_pattern_fn<F, Fut>(&self, pattern: &str, f: F) -> Option<SubscriptionId>
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe_pattern(pattern, TypedHandlerFn::arc(std::any::type_name::<F>(), f))
    }

    /// Removes pattern subscription `id`.
    pub fn unsubscribe_pattern(&self, pattern: &str, id: SubscriptionId) -> bool {
        let removed = self.registry.unsubscribe_pattern(pattern, id);
        if removed {
            debug!(bus = %self.dispatcher.name(), pattern, %id, "pattern unsubscribed");
        }
        removed
    }

    /// Subscribes `handler` for a single delivery on `topic`.
    pub fn once(&self, topic: &str, handler: TypedHandlerRef<T>) -> Option<SubscriptionId> {
        if topic.is_empty() {
            return None;
        }
        let key = HandlerKey::of(&handler);
        let id = self.registry.reserve_id();
        let release = self.registry.release_fn(topic, id);
        let wrapper: TypedHandlerRef<T> = Arc::new(OnceHandler::new(handler, release));
        let reg = self.registry.insert(topic, id, key, wrapper);
        Some(self.registered(topic, reg))
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

    /// Returns `true` if `topic` has exact-topic subscribers.
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

    /// Total number of active subscriptions (exact + pattern).
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if the bus has no subscriptions at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every subscription.
    pub fn close(&self) {
        self.registry.close();
        debug!(bus = %self.dispatcher.name(), "closed");
    }

    // ---------------------------
    // Delivery
    // ---------------------------

    /// Publishes `data` to every handler matching `topic` without waiting.
    ///
    /// - `timeout == 0`: handlers receive `ctx` as is
    /// - `timeout > 0`: each handler receives its own child of `ctx`, cancelled after `timeout`
    ///
    /// Returns the number of handlers scheduled (0 without a tokio runtime, reported as such).
    pub fn publish(&self, ctx: &CancellationToken, topic: &str, data: T, timeout: Duration) -> usize {
        let handlers = self.registry.snapshot(topic);
        let mut count = handlers.len();

        if count > 0 {
            if let Some(rt) = self.dispatcher.runtime(topic) {
                let topic: Arc<str> = Arc::from(topic);
                for handler in handlers {
                    rt.spawn(deliver(
                        Arc::clone(&self.dispatcher),
                        Arc::clone(&topic),
                        handler,
                        ctx.clone(),
                        data.clone(),
                        timeout,
                    ));
                }
            } else {
                count = 0;
            }
        }

        trace!(bus = %self.dispatcher.name(), topic, count, ?timeout, "published");
        self.dispatcher.notify(topic, BusAction::Publish { count });
        count
    }

    /// [`publish`](Self::publish) with the configured default timeout.
    pub fn publish_default(&self, ctx: &CancellationToken, topic: &str, data: T) -> usize {
        let timeout = self.default_timeout.unwrap_or(Duration::ZERO);
        self.publish(ctx, topic, data, timeout)
    }
}

/// Runs one handler invocation with an optional per-invocation deadline.
async fn deliver<T: Send + 'static>(
    dispatcher: Arc<Dispatcher>,
    topic: Arc<str>,
    handler: TypedHandlerRef<T>,
    parent: CancellationToken,
    data: T,
    timeout: Duration,
) {
    if timeout.is_zero() {
        let fut = handler.handle(parent, data);
        dispatcher.guarded(&topic, handler.name(), fut).await;
        return;
    }

    let child = parent.child_token();
    let _cancel_on_exit = child.clone().drop_guard();

    let run = dispatcher.guarded(&topic, handler.name(), handler.handle(child.clone(), data));
    let deadline = async {
        time::sleep(timeout).await;
        child.cancel();
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = run => {}
        _ = deadline => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BusBuilder, BusConfig};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::sync::{mpsc, oneshot};

    type Log = Arc<Mutex<Vec<String>>>;

    fn observed() -> (TypedBus<String>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let bus = BusBuilder::default()
            .with_observer(move |topic: &str, action: &BusAction| {
                sink.lock().push(format!("{topic}:{}", action.as_label()));
            })
            .build_typed::<String>();
        (bus, log)
    }

    #[tokio::test]
    async fn test_publish_delivers_and_reports() {
        let (bus, log) = observed();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe_fn("evt", move |_ctx, data: String| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(data);
            }
        });

        let ctx = CancellationToken::new();
        assert_eq!(bus.publish(&ctx, "evt", "hello".to_string(), Duration::from_millis(10)), 1);

        let got = time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got.as_deref(), Some("hello"));
        assert_eq!(*log.lock(), vec!["evt:subscribe", "evt:publish"]);
    }

    #[tokio::test]
    async fn test_timeout_cancels_handler_token() {
        let bus = TypedBus::<String>::new();
        let (tx, rx) = oneshot::channel::<Duration>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        bus.subscribe_fn("evt", move |ctx: CancellationToken, _data: String| {
            let tx = Arc::clone(&tx);
            async move {
                let started = Instant::now();
                ctx.cancelled().await;
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(started.elapsed());
                }
            }
        });

        let ctx = CancellationToken::new();
        bus.publish(&ctx, "evt", "hi".into(), Duration::from_millis(10));

        let waited = time::timeout(Duration::from_millis(500), rx).await.unwrap().unwrap();
        assert!(waited < Duration::from_millis(100), "cancelled after {waited:?}");
        assert!(!ctx.is_cancelled(), "deadline must not cancel the caller's token");
    }

    #[tokio::test]
    async fn test_deadlines_are_independent_per_handler() {
        let bus = TypedBus::<u32>::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let slow_tx = tx.clone();
        bus.subscribe_fn("evt", move |ctx: CancellationToken, _n: u32| {
            let tx = slow_tx.clone();
            async move {
                ctx.cancelled().await;
                let _ = tx.send("slow:cancelled");
            }
        });
        bus.subscribe_fn("evt", move |ctx: CancellationToken, _n: u32| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(if ctx.is_cancelled() { "fast:cancelled" } else { "fast:live" });
            }
        });

        bus.publish(&CancellationToken::new(), "evt", 1, Duration::from_millis(20));

        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.push(time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec!["fast:live", "slow:cancelled"]);
    }

    #[tokio::test]
    async fn test_zero_timeout_passes_caller_token() {
        let bus = TypedBus::<u32>::new();
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        bus.subscribe_fn("evt", move |ctx: CancellationToken, _n: u32| {
            let tx = Arc::clone(&tx);
            async move {
                ctx.cancelled().await;
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }
        });

        let ctx = CancellationToken::new();
        bus.publish(&ctx, "evt", 7, Duration::ZERO);
        time::sleep(Duration::from_millis(30)).await;
        ctx.cancel();

        time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_panic_is_reported_to_observer() {
        let (bus, log) = observed();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe_fn("evt", |_ctx, _data: String| async move {
            panic!("typed handler exploded");
        });
        bus.subscribe_fn("evt", move |_ctx, data: String| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(data);
            }
        });

        assert_eq!(bus.publish(&CancellationToken::new(), "evt", "x".into(), Duration::ZERO), 2);
        time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

        for _ in 0..100 {
            if log.lock().iter().any(|l| l == "evt:panic") {
                return;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("panic action not observed: {:?}", log.lock());
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_is_reported_once() {
        let (bus, log) = observed();
        let h: TypedHandlerRef<String> =
            TypedHandlerFn::arc("h", |_ctx: CancellationToken, _data: String| async {});
        let a = bus.subscribe("evt", Arc::clone(&h));
        let b = bus.subscribe("evt", h);

        assert_eq!(a, b);
        assert_eq!(bus.stats()["evt"], 1);
        assert_eq!(*log.lock(), vec!["evt:subscribe"]);
    }

    #[tokio::test]
    async fn test_once_with_same_handler_is_deduplicated() {
        let (bus, log) = observed();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let h: TypedHandlerRef<String> = TypedHandlerFn::arc("h", move |_ctx: CancellationToken, _data: String| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        let a = bus.once("evt", Arc::clone(&h));
        let b = bus.once("evt", Arc::clone(&h));
        assert_eq!(a, b);
        assert_eq!(bus.len(), 1);

        let ctx = CancellationToken::new();
        assert_eq!(bus.publish(&ctx, "evt", "x".to_string(), Duration::ZERO), 1);
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(bus.is_empty());
        assert_eq!(*log.lock(), vec!["evt:subscribe", "evt:publish"]);
    }

    #[test]
    fn test_publish_without_runtime_is_still_observed() {
        let (bus, log) = observed();
        bus.subscribe_fn("evt", |_ctx: CancellationToken, _data: String| async {});

        assert_eq!(bus.publish(&CancellationToken::new(), "evt", "x".into(), Duration::ZERO), 0);
        assert_eq!(*log.lock(), vec!["evt:subscribe", "evt:publish"]);
    }

    #[tokio::test]
    async fn test_pattern_and_once() {
        let bus = TypedBus::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        let once: TypedHandlerRef<u32> = TypedHandlerFn::arc("once", move |_ctx: CancellationToken, n: u32| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(n as usize, Ordering::SeqCst);
            }
        });
        bus.once("job.done", once);

        let c = Arc::clone(&calls);
        let pid = bus
            .subscribe_pattern_fn("job.*", move |_ctx: CancellationToken, _n: u32| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(100, Ordering::SeqCst);
                }
            })
            .unwrap();

        let ctx = CancellationToken::new();
        assert_eq!(bus.publish(&ctx, "job.done", 1, Duration::ZERO), 2);
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(bus.publish(&ctx, "job.done", 1, Duration::ZERO), 1);
        assert_eq!(bus.publish(&ctx, "jobless", 1, Duration::ZERO), 0);
        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 201);

        assert!(bus.unsubscribe_pattern("job.*", pid));
        assert!(bus.pattern_stats().is_empty());
    }

    #[tokio::test]
    async fn test_publish_default_uses_config_timeout() {
        let mut cfg = BusConfig::named("typed");
        cfg.default_timeout = Duration::from_millis(10);
        let bus = BusBuilder::new(cfg).build_typed::<u8>();

        let (tx, rx) = oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        bus.subscribe_fn("evt", move |ctx: CancellationToken, _n: u8| {
            let tx = Arc::clone(&tx);
            async move {
                ctx.cancelled().await;
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }
        });

        bus.publish_default(&CancellationToken::new(), "evt", 1);
        time::timeout(Duration::from_millis(500), rx).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_close_then_publish_reaches_nobody() {
        let bus = TypedBus::<u8>::new();
        bus.subscribe_fn("evt", |_ctx: CancellationToken, _n: u8| async {});
        bus.close();

        assert!(!bus.has_subscribers("evt"));
        assert_eq!(bus.publish(&CancellationToken::new(), "evt", 1, Duration::ZERO), 0);
    }
}
