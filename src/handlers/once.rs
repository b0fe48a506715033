//! # Self-removing one-shot wrapper.
//!
//! [`OnceHandler`] wraps a handler so that it fires for at most one delivery.
//!
//! ```text
//! publish A ──► snapshot [once] ──► try_fire() ─ won  ─► release() ─► inner.handle()
//! publish B ──► snapshot [once] ──► try_fire() ─ lost ─► return
//! ```
//!
//! Both publishes may snapshot the wrapper before either removal completes; the
//! compare-and-swap on `fired` decides the single winner. Removal from the
//! registry happens before the wrapped handler runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::events::EventMessage;
use crate::handlers::{Handler, TypedHandler};

/// Removes the wrapper from its registry.
type Release = Box<dyn Fn() + Send + Sync>;

/// One-shot wrapper around a shared handler.
pub(crate) struct OnceHandler<H: ?Sized> {
    inner: Arc<H>,
    fired: AtomicBool,
    release: Release,
}

impl<H: ?Sized> OnceHandler<H> {
    pub(crate) fn new(inner: Arc<H>, release: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner,
            fired: AtomicBool::new(false),
            release: Box::new(release),
        }
    }

    /// Claims the single delivery and unsubscribes; `false` if already claimed.
    fn try_fire(&self) -> bool {
        let won = self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            (self.release)();
        }
        won
    }

    #[cfg(test)]
    fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Handler for OnceHandler<dyn Handler> {
    async fn handle(&self, msg: Arc<EventMessage>) {
        if self.try_fire() {
            self.inner.handle(msg).await;
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<T: Send + 'static> TypedHandler<T> for OnceHandler<dyn TypedHandler<T>> {
    async fn handle(&self, ctx: CancellationToken, data: T) {
        if self.try_fire() {
            self.inner.handle(ctx, data).await;
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerFn, HandlerRef};
    use serde_json::Value;
    use std::sync::atomic::AtomicUsize;

    fn counting(calls: Arc<AtomicUsize>) -> HandlerRef {
        HandlerFn::arc("count", move |_msg: Arc<EventMessage>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn test_fires_once_and_releases_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&releases);
        let once = OnceHandler::new(counting(Arc::clone(&calls)), move || {
            r.fetch_add(1, Ordering::SeqCst);
        });

        let msg = Arc::new(EventMessage::new("evt", Value::Null));
        once.handle(Arc::clone(&msg)).await;
        once.handle(msg).await;

        assert!(once.has_fired());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deliveries_have_single_winner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let once: Arc<OnceHandler<dyn Handler>> =
            Arc::new(OnceHandler::new(counting(Arc::clone(&calls)), || {}));
        let msg = Arc::new(EventMessage::new("evt", Value::Null));

        let mut joins = Vec::new();
        for _ in 0..16 {
            let once = Arc::clone(&once);
            let msg = Arc::clone(&msg);
            joins.push(tokio::spawn(async move { once.handle(msg).await }));
        }
        for j in joins {
            j.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
