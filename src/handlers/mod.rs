//! # Handler abstractions.
//!
//! This module provides the handler-related types:
//! - [`Handler`] - trait for untyped handlers receiving an [`EventMessage`](crate::EventMessage)
//! - [`HandlerFn`] - closure-backed untyped handler
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler>`)
//! - [`TypedHandler`] - trait for handlers of a [`TypedBus`](crate::TypedBus), token-aware
//! - [`TypedHandlerFn`] / [`TypedHandlerRef`] - closure-backed typed handler and its shared handle
//!
//! Handler **identity** is the `Arc` allocation: subscribing the same `HandlerRef`
//! twice to one topic registers it once.

mod handler;
mod handler_fn;
mod once;
mod typed;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
pub use typed::{TypedHandler, TypedHandlerFn, TypedHandlerRef};

pub(crate) use once::OnceHandler;
