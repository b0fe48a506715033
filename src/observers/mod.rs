//! # Bus observers.
//!
//! An observer is the bus's observability hook: it is told about every new
//! subscription, every publish fan-out and every contained handler panic.
//!
//! ## Architecture
//! ```text
//!   subscribe(topic, h) ───────────────► Observe::on_action(topic, Subscribe)
//!   publish(topic, data) ── spawn N ───► Observe::on_action(topic, Publish { count: N })
//!        └─► handler task ── panic ────► Observe::on_action(topic, Panic { error })
//! ```
//!
//! Observers are called synchronously from whichever task triggered the action,
//! so implementations must be cheap and non-blocking (forward to a channel if
//! real work is needed). A panicking observer is contained as well.

mod observer;

#[cfg(feature = "logging")]
mod log;

pub use observer::{Observe, ObserverRef};

#[cfg(feature = "logging")]
pub use log::LogObserver;
