//! # LogObserver — bus actions into `tracing`
//!
//! A minimal observer that mirrors every [`BusAction`] into `tracing` events.
//! Use it for tests or demos.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG eventvisor: subscribed topic="user.create"
//! DEBUG eventvisor: published topic="user.create" count=2
//!  WARN eventvisor: handler panicked topic="user.create" error="boom"
//! ```

use tracing::{debug, warn};

use crate::events::BusAction;
use crate::observers::Observe;

/// Observer writing bus actions to `tracing`.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    /// Construct a new [`LogObserver`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Observe for LogObserver {
    fn on_action(&self, topic: &str, action: &BusAction) {
        match action {
            BusAction::Subscribe => {
                debug!(target: "eventvisor", topic, "subscribed");
            }
            BusAction::Publish { count } => {
                debug!(target: "eventvisor", topic, count, "published");
            }
            BusAction::Panic { error } => {
                warn!(target: "eventvisor", topic, error = %error, "handler panicked");
            }
        }
    }

    fn name(&self) -> &str {
        "LogObserver"
    }
}
