//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the node, loop actors, deferred
//! actions and the fault classifier.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Node`, `Registry`, `LoopActor`, deferred actions, fault reporting.
//! - **Consumers**: anyone holding a receiver from [`Node::subscribe`](crate::Node::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
