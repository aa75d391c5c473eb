//! # Task registry - arena of background work owned by the node.
//!
//! Every supervised loop and deferred action is spawned through the registry.
//! The registry keeps the join handle and counts outstanding work so that
//! [`Node::stop`](crate::Node::stop) can wait for all of it.
//!
//! ## Architecture
//! ```text
//! register(origin, kind, fut)
//!   ├─► outstanding += 1
//!   ├─► tokio::spawn(WorkGuard + fut)      (guard drop → outstanding -= 1)
//!   └─► handles[id] = Handle { origin, kind, join }
//!
//! wait_all()
//!   loop {
//!     ├─► drain handles        (empty → break)
//!     └─► join each            (panic → TaskPanicked, logged)
//!   }
//!   └─► wait for outstanding == 0   (covers handles drained by another caller)
//! ```
//!
//! ## Rules
//! - The counter never goes negative: each guard is created once, dropped once
//! - The guard is dropped on normal exit and on panic
//! - Registrations made while `wait_all` runs are joined by the same call
//! - Concurrent `wait_all` callers all return only once the counter is zero
//! - Finished handles are reaped on registration so the arena stays bounded

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::events::{Bus, Event, EventKind};

/// What a registered task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    Loop,
    Deferred,
}

impl TaskKind {
    fn as_str(self) -> &'static str {
        match self {
            TaskKind::Loop => "loop",
            TaskKind::Deferred => "deferred",
        }
    }
}

/// Handle to a spawned task.
struct Handle {
    origin: Arc<str>,
    kind: TaskKind,
    join: JoinHandle<()>,
}

/// Decrements the outstanding counter when the task body is dropped.
struct WorkGuard {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n -= 1);
    }
}

/// Arena of registered loops and deferred actions.
pub(crate) struct Registry {
    next_id: AtomicU64,
    handles: Mutex<HashMap<u64, Handle>>,
    outstanding: Arc<watch::Sender<usize>>,
    bus: Bus,
}

impl Registry {
    /// Creates an empty registry.
    pub(crate) fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            handles: Mutex::new(HashMap::new()),
            outstanding: Arc::new(watch::Sender::new(0)),
            bus,
        })
    }

    /// Spawns `fut` as tracked work.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn register<F>(&self, origin: Arc<str>, kind: TaskKind, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.send_modify(|n| *n += 1);
        let guard = WorkGuard {
            outstanding: Arc::clone(&self.outstanding),
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut handles = self.lock();
        self.reap_finished(&mut handles);

        let join = tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });
        handles.insert(id, Handle { origin, kind, join });
    }

    /// Number of registered tasks that have not reached a terminal state.
    pub(crate) fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Joins every registered task, including ones registered during the wait.
    ///
    /// Returns once the outstanding counter reaches zero, even if another
    /// caller already took the handles.
    pub(crate) async fn wait_all(&self) {
        loop {
            let batch: Vec<Handle> = {
                let mut handles = self.lock();
                handles.drain().map(|(_, h)| h).collect()
            };
            if batch.is_empty() {
                break;
            }

            debug!(count = batch.len(), "joining registered tasks");
            for h in batch {
                let res = h.join.await;
                self.report(&h.origin, h.kind, res);
            }
        }

        let mut idle = self.outstanding.subscribe();
        // the sender lives as long as `self`, so this cannot see a closed channel
        let _ = idle.wait_for(|n| *n == 0).await;
    }

    /// Drops handles of tasks that already finished, reporting panics.
    fn reap_finished(&self, handles: &mut HashMap<u64, Handle>) {
        let done: Vec<u64> = handles
            .iter()
            .filter(|(_, h)| h.join.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for id in done {
            if let Some(mut h) = handles.remove(&id) {
                if let Some(res) = (&mut h.join).now_or_never() {
                    self.report(&h.origin, h.kind, res);
                }
            }
        }
    }

    fn report(&self, origin: &str, kind: TaskKind, res: Result<(), JoinError>) {
        let Err(je) = res else {
            return;
        };
        if je.is_panic() {
            error!(origin, kind = kind.as_str(), "registered task panicked");
            self.bus.publish(
                Event::new(EventKind::TaskPanicked)
                    .with_origin(origin)
                    .with_reason(format!("{} panicked", kind.as_str())),
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Handle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
