//! # tunvisor
//!
//! **tunvisor** is the lifecycle and fault-management core of a peer-to-peer
//! tunneling node. It owns the node's running/stopped state, supervises the
//! long-lived background work (packet routing, encrypted link I/O,
//! control-plane serving) and decides, fault by fault, whether a network error
//! is transient noise or a reason to bring the node down.
//!
//! Routing, encryption, the control-plane server and the tunnel device are
//! collaborators; they plug in through [`Router`], [`ControlBinder`] and the
//! fault-reporting methods on [`Node`].
//!
//! ## Architecture
//! ```text
//!   router / link / cipher / main
//!        │ run_loop   │ run_deferred   │ report_*_fault
//!        ▼            ▼                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Node (lifecycle controller)                                   │
//! │  - CancellationToken (run context, running → cancelled once)  │
//! │  - Registry (join handles + outstanding-work counter)         │
//! │  - Bus (broadcast events)                                     │
//! │  - FatalHandler (process exit by default)                     │
//! └──────┬──────────────────┬─────────────────────┬───────────────┘
//!        ▼                  ▼                     ▼
//!   LoopActor ...      deferred action ...   classify_send_fault
//!   (fail-fast)        (after cancel)        (errno decision table)
//! ```
//!
//! ### Supervised loop
//! ```text
//! loop {
//!   ├─► cancelled?     → exit (cancelled)
//!   ├─► work(ctx)
//!   │     ├─ Ok        → again
//!   │     ├─ Stop      → exit (stopped cleanly, node keeps running)
//!   │     └─ Err       → cancelled meanwhile? exit : log + cancel node
//! }
//! ```
//!
//! ### Link send faults
//! | errno                                                   | outcome            |
//! |---------------------------------------------------------|--------------------|
//! | `ENETUNREACH`, `ENOBUFS`, `ENETDOWN`, `EADDRNOTAVAIL`   | info log, continue |
//! | any other errno                                         | fatal              |
//! | no errno (not I/O, or I/O without OS code)              | fatal              |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use tunvisor::{LoopError, Node, NodeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let node = Node::builder(NodeConfig::default()).build();
//!
//!     // one-shot initialisation modelled as a loop
//!     node.run_named_loop("init", |_ctx: CancellationToken| async {
//!         Err::<(), _>(LoopError::Stop)
//!     });
//!
//!     let n = Arc::clone(&node);
//!     node.run_deferred(move || assert!(n.is_done()));
//!
//!     node.stop().await;
//! }
//! ```
mod collab;
mod config;
mod core;
mod error;
mod events;
mod faults;
mod tasks;

// ---- Public re-exports ----

pub use collab::{ControlBinder, ControlServer, Router};
pub use config::NodeConfig;
pub use crate::core::{FatalHandler, Node, NodeBuilder, ProcessExit};
pub use error::{ControlError, FaultError, LoopError};
pub use events::{Event, EventKind};
pub use faults::{BENIGN_SEND_ERRNOS, SendFault, classify_send_fault, is_benign_errno, os_errno};
pub use tasks::{BoxLoopFuture, LoopFn, LoopRef, LoopTask};
