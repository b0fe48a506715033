//! Event data model: messages and observable bus actions.
//!
//! This module groups the **payload envelope** delivered to handlers and the
//! **action** vocabulary reported to observers.
//!
//! ## Contents
//! - [`EventMessage`] envelope built once per publish call (id, timestamp, topic, payload)
//! - [`BusAction`] what happened on the bus (`subscribe`, `publish`, `panic`)
//!
//! ## Quick reference
//! - **Producers**: [`EventBus::publish`](crate::EventBus::publish),
//!   [`EventBus::sync_publish`](crate::EventBus::sync_publish).
//! - **Consumers**: any [`Handler`](crate::Handler); observers see [`BusAction`]s.

mod action;
mod message;

pub use action::BusAction;
pub use message::EventMessage;
