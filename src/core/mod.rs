//! Bus core: registry, matching, dispatch and the two bus flavours.
//!
//! The public API from this module is [`EventBus`], [`TypedBus`], their
//! [`BusBuilder`] and [`BusConfig`], plus [`SubscriptionId`] and the pure
//! [`topic_matches`] predicate.
//!
//! Internal modules:
//! - [`registry`]: topic/pattern → handler lists behind one reader/writer lock;
//! - [`pattern`]: trailing-wildcard prefix matching;
//! - [`dispatch`]: panic-contained handler execution and observer reporting;
//! - [`bus`]: untyped bus with async and sync delivery;
//! - [`typed`]: typed bus with token-scoped per-handler timeouts.

mod builder;
mod bus;
mod config;
mod dispatch;
mod pattern;
mod registry;
mod typed;

pub use builder::BusBuilder;
pub use bus::EventBus;
pub use config::BusConfig;
pub use pattern::{topic_matches, WILDCARD};
pub use registry::SubscriptionId;
pub use typed::TypedBus;
