use std::sync::Arc;

use crate::{
    collab::{ControlBinder, Router},
    config::NodeConfig,
    core::{
        fatal::{FatalHandler, ProcessExit},
        node::Node,
    },
};

/// Builder for constructing a [`Node`] with its collaborators.
///
/// Building a node is the "start" of its lifecycle: the run context is created
/// in the running state and the outstanding-work counter starts at zero.
pub struct NodeBuilder {
    cfg: NodeConfig,
    router: Option<Arc<dyn Router>>,
    binder: Option<Arc<dyn ControlBinder>>,
    fatal: Option<Arc<dyn FatalHandler>>,
}

impl NodeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: NodeConfig) -> Self {
        Self {
            cfg,
            router: None,
            binder: None,
            fatal: None,
        }
    }

    /// Attaches the routing component (tunnel address, control-plane handler).
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Attaches the control-plane server factory used by [`Node::start_control`].
    pub fn with_control(mut self, binder: Arc<dyn ControlBinder>) -> Self {
        self.binder = Some(binder);
        self
    }

    /// Replaces the default fatal handler ([`ProcessExit`] with `cfg.exit_code`).
    pub fn with_fatal_handler(mut self, handler: Arc<dyn FatalHandler>) -> Self {
        self.fatal = Some(handler);
        self
    }

    /// Builds and returns the node.
    pub fn build(self) -> Arc<Node> {
        let fatal: Arc<dyn FatalHandler> = match self.fatal {
            Some(handler) => handler,
            None => Arc::new(ProcessExit::new(self.cfg.exit_code)),
        };
        Arc::new(Node::new_internal(self.cfg, fatal, self.router, self.binder))
    }
}
