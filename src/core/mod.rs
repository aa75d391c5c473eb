//! Runtime core: node lifecycle, supervision and shutdown.
//!
//! The public API from this module is [`Node`] (built through [`NodeBuilder`])
//! and the [`FatalHandler`] escalation seam.
//!
//! Internal modules:
//! - [`node`]: run context, registration, fault sinks, collaborators;
//! - [`actor`]: runs one supervised loop with the fail-fast policy;
//! - [`deferred`]: runs cleanup actions after cancellation;
//! - [`registry`]: arena of spawned work and the outstanding-work counter;
//! - [`shutdown`]: cancel handle and OS signal handling;
//! - [`fatal`]: what happens on a node-fatal fault.

mod actor;
mod builder;
mod deferred;
mod fatal;
mod node;
mod registry;
mod shutdown;

pub use builder::NodeBuilder;
pub use fatal::{FatalHandler, ProcessExit};
pub use node::Node;
