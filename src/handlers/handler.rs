//! # Untyped event handler.
//!
//! A [`Handler`] receives every [`EventMessage`] published on a topic (or pattern)
//! it is subscribed to. The message is shared between all handlers of one
//! publish through an `Arc`.
//!
//! Handlers run outside any bus lock and may subscribe/unsubscribe/publish
//! re-entrantly. A panicking handler is contained at the dispatch boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::EventMessage;

/// # Asynchronous event handler.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use eventvisor::{EventMessage, Handler};
///
/// struct Audit;
///
/// #[async_trait]
/// impl Handler for Audit {
///     async fn handle(&self, msg: Arc<EventMessage>) {
///         // write audit record...
///         let _ = msg.topic();
///     }
///
///     fn name(&self) -> &str { "audit" }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles a single message.
    async fn handle(&self, msg: Arc<EventMessage>);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to an untyped handler.
///
/// The allocation behind the `Arc` is the handler's identity for deduplication.
pub type HandlerRef = Arc<dyn Handler>;
