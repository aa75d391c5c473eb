//! # Fatal escalation seam.
//!
//! Node-fatal faults end in [`FatalHandler::terminate`]. The default
//! [`ProcessExit`] ends the process; tests and embedders can inject their own
//! handler through [`NodeBuilder::with_fatal_handler`](crate::NodeBuilder::with_fatal_handler).

/// Receives node-fatal faults after they have been logged.
///
/// Called at most once per fatal report and never after shutdown has begun.
pub trait FatalHandler: Send + Sync + 'static {
    /// Terminates the node. `source` names the reporting path, `reason` the error.
    fn terminate(&self, source: &str, reason: &str);
}

/// Default handler: exits the process with a fixed status.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExit {
    code: i32,
}

impl ProcessExit {
    /// Creates a handler exiting with `code`.
    #[must_use]
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

impl FatalHandler for ProcessExit {
    fn terminate(&self, _source: &str, _reason: &str) {
        std::process::exit(self.code)
    }
}
