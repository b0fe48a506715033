//! # Actions reported to bus observers.
//!
//! The [`BusAction`] enum classifies what happened on a bus:
//! - **Subscribe**: a new subscription was registered
//! - **Publish**: a publish fanned out to `count` handlers
//! - **Panic**: a handler panicked; the panic message is attached
//!
//! ## Example
//! ```rust
//! use eventvisor::BusAction;
//!
//! let action = BusAction::Publish { count: 2 };
//! assert_eq!(action.as_label(), "publish");
//! assert_eq!(action.count(), Some(2));
//! ```

use std::sync::Arc;

/// Observable action on a bus, passed to [`Observe::on_action`](crate::Observe::on_action).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusAction {
    /// A new subscription was registered (duplicates are not reported).
    Subscribe,

    /// A publish scheduled `count` handlers.
    ///
    /// Reported once per publish call, after scheduling (not after completion).
    Publish {
        /// Number of handlers the publish fanned out to.
        count: usize,
    },

    /// A handler panicked during delivery.
    ///
    /// The panic was contained; siblings and the publisher are unaffected.
    Panic {
        /// Panic payload rendered as text.
        error: Arc<str>,
    },
}

impl BusAction {
    /// Returns the stable action name (`"subscribe"`, `"publish"`, `"panic"`).
    pub fn as_label(&self) -> &'static str {
        match self {
            BusAction::Subscribe => "subscribe",
            BusAction::Publish { .. } => "publish",
            BusAction::Panic { .. } => "panic",
        }
    }

    /// Fan-out count for `Publish`, `None` otherwise.
    #[inline]
    pub fn count(&self) -> Option<usize> {
        match self {
            BusAction::Publish { count } => Some(*count),
            _ => None,
        }
    }

    /// Panic message for `Panic`, `None` otherwise.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        match self {
            BusAction::Panic { error } => Some(&**error),
            _ => None,
        }
    }

    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, BusAction::Panic { .. })
    }
}
