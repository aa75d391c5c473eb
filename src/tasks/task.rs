//! # Loop work abstraction.
//!
//! A [`LoopTask`] is one unit of repeatable work. The loop actor calls
//! [`LoopTask::iterate`] over and over, passing the node's run context so the
//! work can notice shutdown while it is blocked on I/O.
//!
//! Returning:
//! - `Ok(())` → iterate again
//! - `Err(LoopError::Stop)` → finish cleanly, node keeps running
//! - any other `Err` → node-wide shutdown

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::LoopError;

/// Future returned by one iteration.
pub type BoxLoopFuture = BoxFuture<'static, Result<(), LoopError>>;

/// Shared handle to a loop.
pub type LoopRef = Arc<dyn LoopTask>;

/// # Repeatable, cancellable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use tunvisor::{BoxLoopFuture, LoopError, LoopTask};
///
/// struct Once;
///
/// impl LoopTask for Once {
///     fn origin(&self) -> &str { "once" }
///
///     fn iterate(&self, _ctx: CancellationToken) -> BoxLoopFuture {
///         Box::pin(async { Err::<(), _>(LoopError::Stop) })
///     }
/// }
/// ```
pub trait LoopTask: Send + Sync + 'static {
    /// Human-readable origin used in diagnostics.
    fn origin(&self) -> &str;

    /// Creates the future for one iteration.
    fn iterate(&self, ctx: CancellationToken) -> BoxLoopFuture;
}
