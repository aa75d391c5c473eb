//! Error types used by the tunvisor runtime, supervised loops, and collaborators.
//!
//! This module defines three enums:
//!
//! - [`LoopError`] - outcome of one failed iteration of a supervised loop.
//! - [`ControlError`] - failures of the control-plane server collaborator.
//! - [`FaultError`] - why a link send fault could not be reduced to an OS errno.
//!
//! All of them provide `as_label` for logs/events.

use std::fmt::Display;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// # Errors returned by one iteration of a supervised loop.
///
/// [`LoopError::Stop`] is the "stop requested" sentinel: the loop finishes cleanly
/// and the node keeps running. Every other variant escalates to whole-node shutdown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoopError {
    /// The loop asked to stop; not a fault.
    #[error("loop stop requested")]
    Stop,

    /// The iteration failed; the node is cancelled.
    #[error("loop failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl LoopError {
    /// Builds a [`LoopError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use tunvisor::LoopError;
    ///
    /// let err = LoopError::fail("socket closed");
    /// assert_eq!(err.to_string(), "loop failed: socket closed");
    /// assert!(!err.is_stop());
    /// ```
    pub fn fail(error: impl Display) -> Self {
        LoopError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns `true` for the clean-stop sentinel.
    pub fn is_stop(&self) -> bool {
        matches!(self, LoopError::Stop)
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoopError::Stop => "loop_stop",
            LoopError::Fail { .. } => "loop_failed",
        }
    }
}

impl From<io::Error> for LoopError {
    fn from(err: io::Error) -> Self {
        LoopError::fail(err)
    }
}

/// # Errors produced by the control-plane server collaborator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ControlError {
    /// The server could not bind its listen address.
    #[error("control server bind {addr} failed: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The server failed while closing.
    #[error("control server close failed: {reason}")]
    Close {
        /// Human-readable reason.
        reason: String,
    },

    /// `stop_control` was called without a running server.
    #[error("control server not started")]
    NotStarted,

    /// `start_control` was called while a server is already running.
    #[error("control server already started")]
    AlreadyStarted,

    /// No binder was configured on the node.
    #[error("control server binder not configured")]
    NotConfigured,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::Bind { .. } => "control_bind",
            ControlError::Close { .. } => "control_close",
            ControlError::NotStarted => "control_not_started",
            ControlError::AlreadyStarted => "control_already_started",
            ControlError::NotConfigured => "control_not_configured",
        }
    }
}

/// # Reasons a link send fault cannot be classified by errno.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// Neither the error nor any of its sources is an I/O error.
    #[error("not an i/o error")]
    NotIo,

    /// An I/O error was found, but it carries no OS error number.
    #[error("i/o error without os errno ({kind:?})")]
    NoErrno {
        /// Kind of the I/O error that was found.
        kind: io::ErrorKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_sentinel() {
        assert!(LoopError::Stop.is_stop());
        assert_eq!(LoopError::Stop.as_label(), "loop_stop");
        assert_eq!(LoopError::fail("x").as_label(), "loop_failed");
    }

    #[test]
    fn test_io_error_converts_to_fail() {
        let err: LoopError = io::Error::other("boom").into();
        assert!(matches!(err, LoopError::Fail { ref error } if error == "boom"));
    }

    #[test]
    fn test_control_error_keeps_source() {
        use std::error::Error as _;

        let err = ControlError::Bind {
            addr: "127.0.0.1:8080".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.source().is_some());
        assert_eq!(err.as_label(), "control_bind");
    }
}
