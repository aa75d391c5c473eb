//! # Collaborator seams.
//!
//! The node does no routing, encryption or HTTP serving itself. It only talks
//! to those components through the traits below:
//!
//! - [`Router`] - owns the node's tunnel address and answers control-plane requests
//! - [`ControlServer`] - a running control-plane server
//! - [`ControlBinder`] - starts a [`ControlServer`] on a bind address
//!
//! Cipher and link components need no trait: they report faults through
//! [`Node`](crate::Node) directly.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::error::ControlError;

/// Routing component as seen by the lifecycle core.
pub trait Router: Send + Sync + 'static {
    /// Tunnel address assigned to this node.
    fn tunnel_addr(&self) -> Ipv4Addr;
}

/// Running control-plane server.
pub trait ControlServer: Send + 'static {
    /// Registers the routing component as a request handler.
    fn register(&mut self, handler: Arc<dyn Router>);

    /// Shuts the server down.
    fn close(&mut self) -> Result<(), ControlError>;
}

/// Factory for control-plane servers.
pub trait ControlBinder: Send + Sync + 'static {
    /// Binds a new server on `addr`.
    fn bind(&self, addr: SocketAddr) -> Result<Box<dyn ControlServer>, ControlError>;
}
