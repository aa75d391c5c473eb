//! # Function-backed loop (`LoopFn`)
//!
//! [`LoopFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per iteration. State shared between iterations lives in an explicit
//! `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use tunvisor::{LoopError, LoopFn, LoopRef, LoopTask};
//!
//! let l: LoopRef = LoopFn::arc("router", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(LoopError::Stop);
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(l.origin(), "router");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::LoopError;
use crate::tasks::task::{BoxLoopFuture, LoopTask};

/// Function-backed loop implementation.
#[derive(Debug)]
pub struct LoopFn<F> {
    origin: Cow<'static, str>,
    f: F,
}

impl<F> LoopFn<F> {
    /// Creates a new function-backed loop.
    ///
    /// Prefer [`LoopFn::arc`] when you immediately need a [`LoopRef`](crate::LoopRef).
    pub fn new(origin: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            origin: origin.into(),
            f,
        }
    }

    /// Creates the loop and returns it as a shared handle.
    pub fn arc(origin: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(origin, f))
    }
}

impl<F, Fut> LoopTask for LoopFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
{
    fn origin(&self) -> &str {
        &self.origin
    }

    fn iterate(&self, ctx: CancellationToken) -> BoxLoopFuture {
        Box::pin((self.f)(ctx))
    }
}
