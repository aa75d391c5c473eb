//! # Deferred actions.
//!
//! A deferred action is a cleanup closure that runs exactly once, after the
//! run context is cancelled. It never runs before cancellation; if the node is
//! never stopped it never runs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{Bus, Event, EventKind};

/// Waits for cancellation, then runs `action` synchronously.
pub(crate) async fn run_deferred<F>(origin: Arc<str>, action: F, ctx: CancellationToken, bus: Bus)
where
    F: FnOnce() + Send + 'static,
{
    ctx.cancelled().await;
    action();

    debug!(origin = %origin, "deferred action executed");
    bus.publish(Event::new(EventKind::DeferredExecuted).with_origin(origin));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_action_waits_for_cancellation() {
        let token = CancellationToken::new();
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);

        let handle = tokio::spawn(run_deferred(
            "close-tun".into(),
            move || r.store(true, Ordering::SeqCst),
            token.child_token(),
            Bus::new(4),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!ran.load(Ordering::SeqCst));

        token.cancel();
        handle.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
