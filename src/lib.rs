//! # eventvisor
//!
//! **Eventvisor** is an in-process publish/subscribe event bus for Rust.
//!
//! It lets independent components exchange named messages without holding
//! references to each other: subscriptions by exact topic or trailing-wildcard
//! pattern, one-shot subscriptions, fire-and-forget and in-order delivery,
//! and per-handler panic isolation. A typed variant adds token-scoped
//! cancellation with per-handler timeouts.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Producer A  │   │  Producer B  │   │  Producer C  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ publish          │ sync_publish     │ publish(ctx, .., timeout)
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus / TypedBus<T>                                           │
//! │  - Registry (topic → handlers, patterns → handlers, RwLock)       │
//! │  - Dispatcher (panic containment, observer, runtime handle)       │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ snapshot (exact first, then patterns), lock released │
//!        ▼                  ▼                  ▼               ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  Observe
//!     │  handler 1   │   │  handler 2   │   │  handler N   │  (subscribe /
//!     │ (own task)   │   │ (own task)   │   │ (own task)   │   publish /
//!     └──────────────┘   └──────────────┘   └──────────────┘   panic)
//! ```
//!
//! ### Subscription lifecycle
//! ```text
//! subscribe ──► active ──┬─► unsubscribe / close ──► removed
//!                        └─► (once) first delivery wins CAS ──► fired & removed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Buses**         | Untyped JSON-payload bus and typed token-aware bus.          | [`EventBus`], [`TypedBus`]                |
//! | **Handlers**      | Async handlers as trait objects or closures.                 | [`Handler`], [`HandlerFn`], [`TypedHandler`] |
//! | **Routing**       | Exact topics and trailing-wildcard patterns.                 | [`topic_matches`], [`SubscriptionId`]     |
//! | **Observability** | Hook for subscribe/publish/panic actions.                    | [`Observe`], [`BusAction`]                |
//! | **Errors**        | Typed errors for payload conversion.                         | [`BusError`]                              |
//! | **Configuration** | Instance name and default timeout.                           | [`BusConfig`], [`BusBuilder`]             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogObserver`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{EventBus, EventMessage, TypedBus};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Untyped bus: opaque JSON payloads, pattern routing.
//!     let bus = EventBus::new();
//!     bus.subscribe_pattern_fn("user.*", |msg: Arc<EventMessage>| async move {
//!         println!("[{}] {}", msg.topic(), msg.data);
//!     });
//!     bus.sync_publish("user.create", "ada").await;
//!
//!     // Typed bus: per-handler deadline delivered as a cancelled token.
//!     let jobs: TypedBus<u64> = TypedBus::new();
//!     jobs.subscribe_fn("job.run", |ctx: CancellationToken, id: u64| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => println!("job {id} timed out"),
//!             _ = tokio::time::sleep(Duration::from_millis(1)) => println!("job {id} done"),
//!         }
//!     });
//!     jobs.publish(&CancellationToken::new(), "job.run", 42, Duration::from_millis(50));
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;
mod observers;

// ---- Public re-exports ----

pub use crate::core::{topic_matches, BusBuilder, BusConfig, EventBus, SubscriptionId, TypedBus, WILDCARD};
pub use error::BusError;
pub use events::{BusAction, EventMessage};
pub use handlers::{Handler, HandlerFn, HandlerRef, TypedHandler, TypedHandlerFn, TypedHandlerRef};
pub use observers::{Observe, ObserverRef};

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogObserver;
