//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Arc<EventMessage>) -> Fut`, producing a fresh
//! future per delivery. If a handler needs shared state, capture an `Arc<...>`
//! explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{EventMessage, HandlerFn, HandlerRef};
//!
//! let h: HandlerRef = HandlerFn::arc("printer", |msg: Arc<EventMessage>| async move {
//!     let _ = msg.topic();
//! });
//!
//! assert_eq!(h.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::EventMessage;
use crate::handlers::Handler;

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per delivery.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<EventMessage>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, msg: Arc<EventMessage>) {
        (self.f)(msg).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
