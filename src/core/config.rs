//! # Bus configuration.
//!
//! Provides [`BusConfig`], the settings shared by [`EventBus`](crate::EventBus)
//! and [`TypedBus`](crate::TypedBus) instances built through
//! [`BusBuilder`](crate::BusBuilder).
//!
//! ## Sentinel values
//! - `default_timeout = 0s` → no per-handler deadline for `TypedBus::publish_default`

use std::borrow::Cow;
use std::time::Duration;

/// Configuration of a bus instance.
///
/// ## Field semantics
/// - `name`: label attached to every log line of this bus (several buses may share a process)
/// - `default_timeout`: per-handler deadline used by `TypedBus::publish_default` (`0s` = none)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Instance label used in `tracing` fields.
    pub name: Cow<'static, str>,

    /// Default per-handler timeout for typed publishes.
    ///
    /// - `Duration::ZERO` = handlers get the caller's token unchanged
    /// - `> 0` = each handler invocation gets its own deadline-bound child token
    pub default_timeout: Duration,
}

impl BusConfig {
    /// Creates a default configuration with the given instance name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the default per-handler timeout as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → deadline applied per handler invocation
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.default_timeout == Duration::ZERO {
            None
        } else {
            Some(self.default_timeout)
        }
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `name = "eventbus"`
    /// - `default_timeout = 0s` (no deadline)
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("eventbus"),
            default_timeout: Duration::ZERO,
        }
    }
}
