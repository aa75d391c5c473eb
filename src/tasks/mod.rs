//! # Loop abstractions.
//!
//! This module provides the types a supervised loop is built from:
//! - [`LoopTask`] - trait for one cancellable iteration of repeatable work
//! - [`LoopFn`] - closure-backed implementation
//! - [`LoopRef`] - shared reference to a loop (`Arc<dyn LoopTask>`)

mod task;
mod task_fn;

pub use task::{BoxLoopFuture, LoopRef, LoopTask};
pub use task_fn::LoopFn;
