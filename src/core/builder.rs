use std::sync::Arc;

use tokio::runtime::Handle;

use super::dispatch::Dispatcher;
use super::{BusConfig, EventBus, TypedBus};
use crate::observers::{Observe, ObserverRef};

/// Builder for [`EventBus`] and [`TypedBus`] instances.
///
/// ## Example
/// ```rust
/// use eventvisor::{BusBuilder, BusConfig, EventBus, TypedBus};
///
/// let bus: EventBus = BusBuilder::new(BusConfig::named("orders")).build();
/// let typed: TypedBus<u64> = BusBuilder::new(BusConfig::named("ticks")).build_typed();
/// # let _ = (bus, typed);
/// ```
pub struct BusBuilder {
    cfg: BusConfig,
    observer: Option<ObserverRef>,
    runtime: Option<Handle>,
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl BusBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            observer: None,
            runtime: None,
        }
    }

    /// Sets the observability hook.
    ///
    /// The observer is told about subscriptions, publish fan-outs and handler panics.
    pub fn with_observer(mut self, observer: impl Observe) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Sets an already shared observer (e.g. one observer for several buses).
    pub fn with_observer_ref(mut self, observer: ObserverRef) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Binds handler tasks to `runtime`.
    ///
    /// Without it the bus uses the runtime current at `build()` time, or the
    /// one current at each publish if there was none.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds an untyped [`EventBus`].
    pub fn build(self) -> EventBus {
        let (dispatcher, _) = self.into_parts();
        EventBus::from_parts(dispatcher)
    }

    /// Builds a [`TypedBus`] for payloads of type `T`.
    pub fn build_typed<T: Clone + Send + Sync + 'static>(self) -> TypedBus<T> {
        let (dispatcher, cfg) = self.into_parts();
        TypedBus::from_parts(dispatcher, cfg.default_timeout())
    }

    fn into_parts(self) -> (Dispatcher, BusConfig) {
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        let dispatcher = Dispatcher::new(&self.cfg, self.observer, runtime);
        (dispatcher, self.cfg)
    }
}
