//! # Guarded handler execution.
//!
//! Runs one handler invocation inside a panic-catching frame and reports what
//! happened to the bus's observer and to `tracing`.
//!
//! ## Flow
//!
//! ```text
//! Success:
//!   handler future → () → nothing reported
//!
//! Panic:
//!   handler future → unwind caught → warn! + Observe(Panic { error })
//!                                  → siblings and publisher continue
//! ```
//!
//! ## Rules
//! - A panic never escapes [`Dispatcher::guarded`]
//! - Observer calls are contained too; a panicking observer is logged and ignored
//! - Scheduling needs a tokio runtime; without one nothing is spawned

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{error, warn};

use crate::core::BusConfig;
use crate::events::BusAction;
use crate::observers::ObserverRef;

/// Per-bus execution context shared by every dispatch.
pub(crate) struct Dispatcher {
    name: Arc<str>,
    observer: Option<ObserverRef>,
    runtime: Option<Handle>,
}

impl Dispatcher {
    pub fn new(cfg: &BusConfig, observer: Option<ObserverRef>, runtime: Option<Handle>) -> Self {
        Self {
            name: Arc::from(&*cfg.name),
            observer,
            runtime,
        }
    }

    /// Bus instance label.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forwards `action` to the observer, if any.
    pub fn notify(&self, topic: &str, action: BusAction) {
        let Some(observer) = &self.observer else {
            return;
        };
        let call = std::panic::catch_unwind(AssertUnwindSafe(|| observer.on_action(topic, &action)));
        if let Err(panic) = call {
            warn!(
                bus = %self.name,
                topic,
                observer = observer.name(),
                panic = %panic_message(&*panic),
                "observer panicked"
            );
        }
    }

    /// Awaits `fut`, containing any panic. Returns `false` if it panicked.
    pub async fn guarded<F>(&self, topic: &str, handler: &str, fut: F) -> bool
    where
        F: Future<Output = ()>,
    {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(()) => true,
            Err(panic) => {
                let info = panic_message(&*panic);
                warn!(bus = %self.name, topic, handler, panic = %info, "handler panicked");
                self.notify(
                    topic,
                    BusAction::Panic {
                        error: Arc::from(info),
                    },
                );
                false
            }
        }
    }

    /// Runtime to spawn handler tasks on: the bound one, else the ambient one.
    pub fn runtime(&self, topic: &str) -> Option<Handle> {
        let rt = self.runtime.clone().or_else(|| Handle::try_current().ok());
        if rt.is_none() {
            error!(bus = %self.name, topic, "no tokio runtime available; publish dropped");
        }
        rt
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording() -> (Dispatcher, Arc<Mutex<Vec<(String, BusAction)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: ObserverRef = Arc::new(move |topic: &str, action: &BusAction| {
            sink.lock().push((topic.to_string(), action.clone()));
        });
        (
            Dispatcher::new(&BusConfig::default(), Some(observer), None),
            seen,
        )
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*other), "unknown panic");
    }

    #[tokio::test]
    async fn test_guarded_reports_panic() {
        let (d, seen) = recording();
        let ok = d.guarded("evt", "h", async { panic!("boom") }).await;
        assert!(!ok);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "evt");
        assert_eq!(seen[0].1.error(), Some("boom"));
    }

    #[tokio::test]
    async fn test_guarded_success_reports_nothing() {
        let (d, seen) = recording();
        assert!(d.guarded("evt", "h", async {}).await);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_observer_panic_is_contained() {
        let observer: ObserverRef = Arc::new(|_: &str, _: &BusAction| panic!("observer down"));
        let d = Dispatcher::new(&BusConfig::default(), Some(observer), None);
        d.notify("evt", BusAction::Subscribe);
    }

    #[test]
    fn test_no_runtime_outside_tokio() {
        let d = Dispatcher::new(&BusConfig::default(), None, None);
        assert!(d.runtime("evt").is_none());
    }
}
