//! # Core observer trait
//!
//! `Observe` is the extension point for plugging metrics, audit or logging into a
//! bus. Any `Fn(&str, &BusAction)` closure is an observer.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use eventvisor::{BusAction, BusBuilder, BusConfig};
//!
//! let panics = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&panics);
//!
//! let _bus = BusBuilder::new(BusConfig::default())
//!     .with_observer(move |_topic: &str, action: &BusAction| {
//!         if action.is_panic() {
//!             seen.fetch_add(1, Ordering::Relaxed);
//!         }
//!     })
//!     .build();
//! ```

use std::sync::Arc;

use crate::events::BusAction;

/// Contract for bus observers.
///
/// Called from arbitrary tasks, possibly concurrently. Must not block.
pub trait Observe: Send + Sync + 'static {
    /// Reacts to one bus action on `topic`.
    fn on_action(&self, topic: &str, action: &BusAction);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Observe for F
where
    F: Fn(&str, &BusAction) + Send + Sync + 'static,
{
    fn on_action(&self, topic: &str, action: &BusAction) {
        self(topic, action)
    }
}

/// Shared handle to an observer.
pub type ObserverRef = Arc<dyn Observe>;
