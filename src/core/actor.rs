//! # LoopActor: supervised loop runner.
//!
//! Drives one [`LoopTask`] until it stops, fails or observes cancellation.
//! The policy is fail-fast: any failure other than the stop sentinel cancels
//! the whole node.
//!
//! ## Iteration flow
//! ```text
//! loop {
//!   ├─► ctx cancelled?            → Cancelled (silent)
//!   ├─► task.iterate(ctx).await
//!   │       ├─ Ok(())             → next iteration
//!   │       ├─ Err(Stop)          → Stopped (node keeps running)
//!   │       └─ Err(e) or panic
//!   │            ├─ ctx cancelled → Cancelled (escalation suppressed)
//!   │            └─ otherwise     → log origin + error, shutdown.cancel(), Failed
//! }
//! ```
//!
//! ## Rules
//! - No iteration starts once cancellation is visible
//! - An in-flight iteration is never aborted; it sees `ctx` and may exit early
//! - Exactly one terminal event is published per actor
//! - A panicking iteration is a failure like any other

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    core::shutdown::Shutdown,
    error::LoopError,
    events::{Bus, Event, EventKind},
    tasks::LoopRef,
};

/// Terminal state of a supervised loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// Work returned [`LoopError::Stop`].
    Stopped,
    /// Work failed while the node was running; the node was cancelled.
    Failed,
    /// Cancellation observed.
    Cancelled,
}

/// Supervises one loop on behalf of the node.
pub(crate) struct LoopActor {
    task: LoopRef,
    bus: Bus,
    shutdown: Shutdown,
    log_clean_stop: bool,
}

impl LoopActor {
    pub(crate) fn new(task: LoopRef, bus: Bus, shutdown: Shutdown, log_clean_stop: bool) -> Self {
        Self {
            task,
            bus,
            shutdown,
            log_clean_stop,
        }
    }

    /// Runs the loop until it reaches a terminal state.
    pub(crate) async fn run(self, ctx: CancellationToken) -> LoopExit {
        let mut iterations: u64 = 0;

        loop {
            if ctx.is_cancelled() {
                return self.cancelled(iterations, None);
            }

            // `iterate` may panic before it returns a future
            let res = AssertUnwindSafe(async { self.task.iterate(ctx.clone()).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(LoopError::fail(format!(
                        "iteration panicked: {}",
                        panic_message(&*payload)
                    )))
                });
            iterations += 1;

            match res {
                Ok(()) => {
                    // busy loops must not starve the other tasks on this worker
                    tokio::task::yield_now().await;
                }
                Err(LoopError::Stop) => return self.stopped(iterations),
                Err(e) => {
                    if self.shutdown.is_cancelled() {
                        return self.cancelled(iterations, Some(&e));
                    }
                    return self.failed(iterations, &e);
                }
            }
        }
    }

    fn stopped(&self, iterations: u64) -> LoopExit {
        let origin = self.task.origin();
        if self.log_clean_stop {
            info!(origin, iterations, "loop stopped");
        }
        self.bus.publish(
            Event::new(EventKind::LoopStopped)
                .with_origin(origin)
                .with_iterations(iterations),
        );
        LoopExit::Stopped
    }

    fn cancelled(&self, iterations: u64, err: Option<&LoopError>) -> LoopExit {
        let origin = self.task.origin();
        let mut ev = Event::new(EventKind::LoopCancelled)
            .with_origin(origin)
            .with_iterations(iterations);
        if let Some(e) = err {
            debug!(origin, error = %e, "loop error during shutdown suppressed");
            ev = ev.with_reason(e.to_string());
        }
        self.bus.publish(ev);
        LoopExit::Cancelled
    }

    fn failed(&self, iterations: u64, err: &LoopError) -> LoopExit {
        let origin = self.task.origin();
        error!(origin, iterations, error = %err, "supervised loop failed, shutting down node");
        self.bus.publish(
            Event::new(EventKind::LoopFailed)
                .with_origin(origin)
                .with_iterations(iterations)
                .with_reason(err.to_string()),
        );
        self.shutdown.cancel();
        LoopExit::Failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::LoopFn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn actor(task: LoopRef, token: &CancellationToken) -> LoopActor {
        LoopActor::new(task, Bus::new(16), Shutdown::new(token.clone()), false)
    }

    #[tokio::test]
    async fn test_stop_sentinel_runs_once_and_keeps_node_alive() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        let task: LoopRef = LoopFn::arc("init", move |_ctx: CancellationToken| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(LoopError::Stop) }
        });

        let exit = actor(task, &token).run(token.child_token()).await;
        assert_eq!(exit, LoopExit::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_failure_on_kth_iteration_cancels_node() {
        for k in 1..=5u64 {
            let token = CancellationToken::new();
            let calls = Arc::new(AtomicU64::new(0));
            let c = Arc::clone(&calls);
            let task: LoopRef = LoopFn::arc("worker", move |_ctx: CancellationToken| {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == k {
                        Err(LoopError::fail("link gone"))
                    } else {
                        Ok(())
                    }
                }
            });

            let exit = actor(task, &token).run(token.child_token()).await;
            assert_eq!(exit, LoopExit::Failed);
            assert_eq!(calls.load(Ordering::SeqCst), k);
            assert!(token.is_cancelled());
        }
    }

    #[tokio::test]
    async fn test_already_cancelled_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        let task: LoopRef = LoopFn::arc("idle", move |_ctx: CancellationToken| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), LoopError>(()) }
        });

        let exit = actor(task, &token).run(token.child_token()).await;
        assert_eq!(exit, LoopExit::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_during_shutdown_is_not_escalated() {
        let token = CancellationToken::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let shutdown = Shutdown::new(token.clone());
        let stopper = token.clone();
        let task: LoopRef = LoopFn::arc("reader", move |_ctx: CancellationToken| {
            stopper.cancel();
            async { Err::<(), _>(LoopError::fail("socket closed")) }
        });

        let exit = LoopActor::new(task, bus, shutdown, false)
            .run(token.child_token())
            .await;
        assert_eq!(exit, LoopExit::Cancelled);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LoopCancelled);
        assert_eq!(ev.reason.as_deref(), Some("loop failed: socket closed"));
    }

    #[tokio::test]
    async fn test_cancellation_observed_between_iterations() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        let stopper = token.clone();
        let task: LoopRef = LoopFn::arc("ticker", move |_ctx: CancellationToken| {
            if c.fetch_add(1, Ordering::SeqCst) == 2 {
                stopper.cancel();
            }
            async { Ok::<(), LoopError>(()) }
        });

        let exit = actor(task, &token).run(token.child_token()).await;
        assert_eq!(exit, LoopExit::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_iteration_cancels_node() {
        let token = CancellationToken::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let task: LoopRef = LoopFn::arc("router", |_ctx: CancellationToken| async {
            if true {
                panic!("route table corrupted");
            }
            Ok::<(), LoopError>(())
        });

        let exit = LoopActor::new(task, bus, Shutdown::new(token.clone()), false)
            .run(token.child_token())
            .await;
        assert_eq!(exit, LoopExit::Failed);
        assert!(token.is_cancelled());

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LoopFailed);
        assert_eq!(ev.origin.as_deref(), Some("router"));
        assert_eq!(
            ev.reason.as_deref(),
            Some("loop failed: iteration panicked: route table corrupted")
        );
    }

    #[tokio::test]
    async fn test_panic_before_future_is_built_cancels_node() {
        let token = CancellationToken::new();
        let task: LoopRef = LoopFn::arc("link", |_ctx: CancellationToken| {
            let fail = true;
            if fail {
                panic!("{} closed", "tun0");
            }
            async { Ok::<(), LoopError>(()) }
        });

        let exit = actor(task, &token).run(token.child_token()).await;
        assert_eq!(exit, LoopExit::Failed);
        assert!(token.is_cancelled());
    }
}
