//! # Token-aware handler for [`TypedBus`](crate::TypedBus).
//!
//! A [`TypedHandler<T>`] receives the payload by value together with a
//! [`CancellationToken`]. When the publish carries a timeout, the token is a
//! per-invocation child that gets cancelled at the deadline; the handler is
//! expected to observe it and return early. Nothing force-stops a handler
//! that ignores its token.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use eventvisor::{TypedHandlerFn, TypedHandlerRef};
//!
//! let h: TypedHandlerRef<String> = TypedHandlerFn::arc("greeter", |ctx: CancellationToken, name: String| async move {
//!     if ctx.is_cancelled() {
//!         return;
//!     }
//!     let _ = name.len();
//! });
//! assert_eq!(h.name(), "greeter");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// # Asynchronous, cancelable handler of `T` payloads.
#[async_trait]
pub trait TypedHandler<T: Send + 'static>: Send + Sync + 'static {
    /// Handles one payload.
    ///
    /// Implementations should check `ctx.is_cancelled()` (or await `ctx.cancelled()`)
    /// to honor the publish timeout.
    async fn handle(&self, ctx: CancellationToken, data: T);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a typed handler; the `Arc` allocation is its identity.
pub type TypedHandlerRef<T> = Arc<dyn TypedHandler<T>>;

/// Function-backed typed handler.
#[derive(Debug)]
pub struct TypedHandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TypedHandlerFn<F> {
    /// Creates a new function-backed typed handler.
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
impl<T, F, Fut> TypedHandler<T> for TypedHandlerFn<F>
where
    T: Send + 'static,
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: CancellationToken, data: T) {
        (self.f)(ctx, data).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
