//! # Runtime events emitted by the node, loop actors and fault reporting.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Loop events**: registration and terminal states of supervised loops
//! - **Deferred events**: registration and execution of deferred actions
//! - **Lifecycle events**: shutdown requested, all work stopped, control server
//! - **Fault events**: cipher, link send and node-fatal faults
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tunvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TransientSendFault)
//!     .with_origin("link")
//!     .with_errno(101)
//!     .with_reason("network is unreachable");
//!
//! assert_eq!(ev.kind, EventKind::TransientSendFault);
//! assert_eq!(ev.errno, Some(101));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Loop events ===
    /// Supervised loop registered and spawned.
    ///
    /// Sets: `origin`
    LoopRegistered,

    /// Loop returned the stop sentinel and finished cleanly.
    ///
    /// Sets: `origin`, `iterations`
    LoopStopped,

    /// Loop failed and escalated to whole-node shutdown.
    ///
    /// Sets: `origin`, `iterations`, `reason`
    LoopFailed,

    /// Loop observed cancellation and exited.
    ///
    /// Sets: `origin`, `iterations`, optional `reason` (failure suppressed during shutdown)
    LoopCancelled,

    // === Deferred events ===
    /// Deferred action registered.
    ///
    /// Sets: `origin`
    DeferredRegistered,

    /// Deferred action executed after cancellation.
    ///
    /// Sets: `origin`
    DeferredExecuted,

    // === Lifecycle events ===
    /// `stop()` was called; the run context is cancelled.
    ShutdownRequested,

    /// Every registered loop and deferred action has finished.
    AllStopped,

    /// A registered task panicked; the panic is contained.
    ///
    /// Sets: `origin`, `reason`
    TaskPanicked,

    /// Control-plane server bound and handler registered.
    ///
    /// Sets: `reason` (bind address)
    ControlStarted,

    /// Control-plane server closed.
    ///
    /// Sets: optional `reason` (close failure)
    ControlStopped,

    // === Fault events ===
    /// Cipher fault observed (never fatal).
    ///
    /// Sets: `reason`
    CipherFault,

    /// Link send fault with a benign errno; node keeps running.
    ///
    /// Sets: `errno`, `reason`
    TransientSendFault,

    /// Node-fatal fault; the fatal handler is invoked.
    ///
    /// Sets: `origin` (fault source), `reason`, optional `errno`
    FatalFault,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Origin of the event (loop origin, deferred origin, fault source).
    pub origin: Option<Arc<str>>,
    /// Human-readable reason (errors, addresses, etc.).
    pub reason: Option<Arc<str>>,
    /// OS error number, for link faults.
    pub errno: Option<i32>,
    /// Completed iterations of a loop at the time of the event.
    pub iterations: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            origin: None,
            reason: None,
            errno: None,
            iterations: None,
        }
    }

    /// Attaches an origin.
    #[inline]
    pub fn with_origin(mut self, origin: impl Into<Arc<str>>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an OS error number.
    #[inline]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    /// Attaches an iteration count.
    #[inline]
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Returns `true` for events that bring the node down.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, EventKind::FatalFault | EventKind::LoopFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::AllStopped);
        let b = Event::new(EventKind::AllStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(Event::new(EventKind::FatalFault).is_fatal());
        assert!(Event::new(EventKind::LoopFailed).is_fatal());
        assert!(!Event::new(EventKind::TransientSendFault).is_fatal());
    }
}
