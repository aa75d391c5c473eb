//! # Node runtime configuration.
//!
//! Provides [`NodeConfig`] centralized settings for the node lifecycle core.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus

/// Configuration for a [`Node`](crate::Node).
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `log_clean_stop`: Log an info line when a loop exits through [`LoopError::Stop`](crate::LoopError::Stop)
/// - `exit_code`: Process exit status used by the default fatal handler
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Whether a clean loop stop is logged.
    ///
    /// Clean stops are silent by default; an event is published either way.
    pub log_clean_stop: bool,

    /// Exit status passed to [`std::process::exit`] on a node-fatal fault.
    pub exit_code: i32,
}

impl NodeConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for NodeConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `log_clean_stop = false`
    /// - `exit_code = 1`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            log_clean_stop: false,
            exit_code: 1,
        }
    }
}
