//! # Node: lifecycle controller of a tunneling node.
//!
//! The [`Node`] owns the run context (a [`CancellationToken`]) and the task
//! registry. Everything long-lived the node does (routing loops, link I/O,
//! control-plane serving) is registered here and joined on [`Node::stop`].
//!
//! ## High-level architecture
//! ```text
//! NodeBuilder::build() ──► Node { token, registry, bus, fatal handler, collaborators }
//!
//! Registration:
//!   run_loop(f)      ──► Registry ──► LoopActor::run(child token)
//!   run_deferred(f)  ──► Registry ──► wait cancelled → f()
//!
//! Escalation:
//!   LoopActor failure ──► Shutdown::cancel()  (token cancelled, no wait)
//!
//! Faults (terminal sinks):
//!   report_cipher_fault     ──► log
//!   report_link_recv_fault  ──► log + FatalHandler
//!   report_link_send_fault  ──► classify_send_fault ──► log | log + FatalHandler
//!
//! Shutdown path:
//!   stop() ──► token.cancel() ──► ShutdownRequested
//!          └─► Registry::wait_all() ──► AllStopped
//! ```
//!
//! ## Rules
//! - Cancellation is irreversible and whole-node; there is no per-task cancel
//! - `stop()` returns only after every task registered before it has finished
//! - Escalation to the fatal handler is suppressed once shutdown has begun
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use tunvisor::{LoopError, Node, NodeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let node = Node::builder(NodeConfig::default()).build();
//!
//!     node.run_named_loop("ticker", |ctx: CancellationToken| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Err(LoopError::Stop),
//!             _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => Ok(()),
//!         }
//!     });
//!     node.run_deferred(|| println!("cleanup"));
//!
//!     node.stop().await;
//!     assert_eq!(node.outstanding(), 0);
//! }
//! ```

use std::error::Error;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::panic::Location;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, error, info, warn};

use crate::{
    collab::{ControlBinder, ControlServer, Router},
    config::NodeConfig,
    core::{
        actor::LoopActor,
        builder::NodeBuilder,
        deferred::run_deferred,
        fatal::FatalHandler,
        registry::{Registry, TaskKind},
        shutdown::{Shutdown, wait_for_shutdown_signal},
    },
    error::{ControlError, LoopError},
    events::{Bus, Event, EventKind},
    faults::{SendFault, classify_send_fault},
    tasks::{LoopFn, LoopRef},
};

const SOURCE_CIPHER: &str = "cipher";
const SOURCE_LINK_RECV: &str = "link_recv";
const SOURCE_LINK_SEND: &str = "link_send";

/// Lifecycle controller: run context, task registry and fault sinks.
pub struct Node {
    cfg: NodeConfig,
    bus: Bus,
    token: CancellationToken,
    shutdown: Shutdown,
    registry: Arc<Registry>,
    fatal: Arc<dyn FatalHandler>,
    router: Option<Arc<dyn Router>>,
    binder: Option<Arc<dyn ControlBinder>>,
    control: Mutex<Option<Box<dyn ControlServer>>>,
    stop_requested: AtomicBool,
}

impl Node {
    /// Returns a builder for a node with the given configuration.
    pub fn builder(cfg: NodeConfig) -> NodeBuilder {
        NodeBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: NodeConfig,
        fatal: Arc<dyn FatalHandler>,
        router: Option<Arc<dyn Router>>,
        binder: Option<Arc<dyn ControlBinder>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let token = CancellationToken::new();
        Self {
            shutdown: Shutdown::new(token.clone()),
            registry: Registry::new(bus.clone()),
            cfg,
            bus,
            token,
            fatal,
            router,
            binder,
            control: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
        }
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Cancels the run context and waits until every registered task has finished.
    ///
    /// Idempotent. Concurrent callers all wait for the same work; none returns
    /// while the outstanding counter is above zero.
    pub async fn stop(&self) {
        if !self.stop_requested.swap(true, Ordering::AcqRel) {
            info!("node shutdown requested");
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.token.cancel();

        self.registry.wait_all().await;
        debug!("all node tasks stopped");
        self.bus.publish(Event::new(EventKind::AllStopped));
    }

    /// Completes once the run context is cancelled, whoever cancelled it.
    ///
    /// Any number of callers can hold such a future at the same time.
    pub fn done(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a token that observes the run context.
    ///
    /// Cancelling the returned token does not cancel the node.
    pub fn context(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Flips the run context to cancelled without waiting for outstanding work.
    pub(crate) fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Waits for a termination signal or an internal cancellation, then stops the node.
    ///
    /// Returns `Err` if signal handlers cannot be installed; the node is stopped either way.
    pub async fn run_until_signal(&self) -> std::io::Result<()> {
        let res = tokio::select! {
            res = wait_for_shutdown_signal() => {
                info!("termination signal received");
                res
            }
            _ = self.token.cancelled() => Ok(()),
        };
        if let Err(e) = &res {
            error!(error = %e, "installing signal handlers failed");
        }
        self.cancel();
        self.stop().await;
        res
    }

    /// Number of loops and deferred actions that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.registry.outstanding()
    }

    /// Creates a receiver for runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers a supervised loop tagged with the caller's `file:line`.
    ///
    /// Must be called from within a tokio runtime.
    #[track_caller]
    pub fn run_loop<F, Fut>(&self, f: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
    {
        let origin = caller_origin(Location::caller());
        self.spawn_loop(LoopFn::arc(origin, f));
    }

    /// Registers a supervised loop with an explicit origin.
    pub fn run_named_loop<F, Fut>(&self, origin: impl Into<String>, f: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), LoopError>> + Send + 'static,
    {
        self.spawn_loop(LoopFn::arc(origin.into(), f));
    }

    /// Registers an already-built loop.
    pub fn spawn_loop(&self, task: LoopRef) {
        let origin: Arc<str> = Arc::from(task.origin());
        let actor = LoopActor::new(
            task,
            self.bus.clone(),
            self.shutdown.clone(),
            self.cfg.log_clean_stop,
        );
        let ctx = self.token.child_token();

        debug!(origin = %origin, "loop registered");
        self.bus
            .publish(Event::new(EventKind::LoopRegistered).with_origin(Arc::clone(&origin)));

        let log_origin = Arc::clone(&origin);
        self.registry.register(origin, TaskKind::Loop, async move {
            let exit = actor.run(ctx).await;
            debug!(origin = %log_origin, ?exit, "loop exited");
        });
    }

    /// Registers a cleanup action that runs exactly once after cancellation.
    ///
    /// Must be called from within a tokio runtime.
    #[track_caller]
    pub fn run_deferred<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let origin: Arc<str> = Arc::from(caller_origin(Location::caller()));
        self.bus
            .publish(Event::new(EventKind::DeferredRegistered).with_origin(Arc::clone(&origin)));

        let fut = run_deferred(
            Arc::clone(&origin),
            action,
            self.token.child_token(),
            self.bus.clone(),
        );
        self.registry.register(origin, TaskKind::Deferred, fut);
    }

    // ---------------------------
    // Fault sinks
    // ---------------------------

    /// Observes a cipher fault. Never fatal; silent once shutdown has begun.
    pub fn report_cipher_fault(&self, err: &(dyn Error + 'static)) {
        if self.is_done() {
            return;
        }
        warn!(error = %err, "cipher fault");
        self.bus.publish(
            Event::new(EventKind::CipherFault)
                .with_origin(SOURCE_CIPHER)
                .with_reason(err.to_string()),
        );
    }

    /// Handles a link receive fault. Always fatal unless shutdown has begun.
    pub fn report_link_recv_fault(&self, err: &(dyn Error + 'static)) {
        if self.is_done() {
            return;
        }
        error!(error = %err, "link receive failed");
        self.escalate(SOURCE_LINK_RECV, err.to_string(), None);
    }

    /// Classifies a link send fault by OS errno.
    ///
    /// Benign errnos are logged at info level and ignored. Anything else,
    /// including errors that carry no errno, is fatal.
    pub fn report_link_send_fault(&self, err: &(dyn Error + 'static)) {
        match classify_send_fault(err) {
            SendFault::Transient { errno } => {
                info!(errno, "0x{errno:x} {errno}, {err}");
                self.bus.publish(
                    Event::new(EventKind::TransientSendFault)
                        .with_errno(errno)
                        .with_reason(err.to_string()),
                );
            }
            SendFault::Fatal { errno } => {
                error!(errno, error = %err, "link send failed");
                self.escalate(SOURCE_LINK_SEND, err.to_string(), Some(errno));
            }
            SendFault::Unclassified(why) => {
                error!(error = %err, reason = %why, "link send failed");
                self.escalate(SOURCE_LINK_SEND, err.to_string(), None);
            }
        }
    }

    fn escalate(&self, source: &'static str, reason: String, errno: Option<i32>) {
        if self.is_done() {
            debug!(source, reason = %reason, "fatal fault during shutdown suppressed");
            return;
        }

        let mut ev = Event::new(EventKind::FatalFault)
            .with_origin(source)
            .with_reason(reason.as_str());
        if let Some(n) = errno {
            ev = ev.with_errno(n);
        }
        self.bus.publish(ev);
        self.fatal.terminate(source, &reason);
    }

    // ---------------------------
    // Collaborators
    // ---------------------------

    /// Tunnel address assigned by the router, if one is attached.
    pub fn tunnel_addr(&self) -> Option<Ipv4Addr> {
        self.router.as_ref().map(|r| r.tunnel_addr())
    }

    /// Binds the control-plane server and registers the router as its handler.
    pub fn start_control(&self, addr: SocketAddr) -> Result<(), ControlError> {
        let binder = self.binder.as_ref().ok_or(ControlError::NotConfigured)?;

        let mut slot = self.control_slot();
        if slot.is_some() {
            return Err(ControlError::AlreadyStarted);
        }

        let mut server = binder.bind(addr)?;
        if let Some(router) = &self.router {
            server.register(Arc::clone(router));
        }
        *slot = Some(server);

        info!(%addr, "control server started");
        self.bus
            .publish(Event::new(EventKind::ControlStarted).with_reason(addr.to_string()));
        Ok(())
    }

    /// Closes the control-plane server. Failures are logged, never escalated.
    pub fn stop_control(&self) {
        let server = self.control_slot().take();
        let Some(mut server) = server else {
            warn!(error = %ControlError::NotStarted, "stop_control ignored");
            return;
        };

        let mut ev = Event::new(EventKind::ControlStopped);
        if let Err(e) = server.close() {
            error!(error = %e, "control server close failed");
            ev = ev.with_reason(e.to_string());
        }
        self.bus.publish(ev);
    }

    fn control_slot(&self) -> MutexGuard<'_, Option<Box<dyn ControlServer>>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Formats a call site as `file.rs:line`.
fn caller_origin(loc: &Location<'_>) -> String {
    let file = Path::new(loc.file())
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(loc.file());
    format!("{file}:{}", loc.line())
}
