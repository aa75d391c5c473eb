//! # Network fault classification.
//!
//! Link send faults are reduced to the OS error number they carry and matched
//! against a fixed set of transient conditions. Everything else is fatal.
//!
//! ```text
//! err ──► find io::Error in err / source chain ──► raw_os_error()
//!            │ none                                  │ none        │ Some(errno)
//!            ▼                                       ▼             ▼
//!        Unclassified(NotIo)              Unclassified(NoErrno)   benign? ─► Transient
//!                                                                    └────► Fatal
//! ```
//!
//! The benign set is platform specific:
//! - **Unix**: `ENETUNREACH`, `ENOBUFS`, `ENETDOWN`, `EADDRNOTAVAIL`
//! - **Windows**: the matching `WSAE*` codes
//!
//! Receive and cipher faults are not classified by errno; see
//! [`Node::report_link_recv_fault`](crate::Node::report_link_recv_fault) and
//! [`Node::report_cipher_fault`](crate::Node::report_cipher_fault).

use std::error::Error;
use std::io;

use crate::error::FaultError;

/// OS error numbers a link send may report while the network flaps.
#[cfg(unix)]
pub const BENIGN_SEND_ERRNOS: [i32; 4] = [
    libc::ENETUNREACH,
    libc::ENOBUFS,
    libc::ENETDOWN,
    libc::EADDRNOTAVAIL,
];

/// OS error numbers a link send may report while the network flaps.
///
/// `WSAENETUNREACH`, `WSAENOBUFS`, `WSAENETDOWN`, `WSAEADDRNOTAVAIL`.
#[cfg(windows)]
pub const BENIGN_SEND_ERRNOS: [i32; 4] = [10051, 10055, 10050, 10049];

/// OS error numbers a link send may report while the network flaps.
#[cfg(not(any(unix, windows)))]
pub const BENIGN_SEND_ERRNOS: [i32; 0] = [];

/// Outcome of classifying a link send fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFault {
    /// Benign errno; log and keep running.
    Transient {
        /// OS error number.
        errno: i32,
    },
    /// Any other errno; node-fatal.
    Fatal {
        /// OS error number.
        errno: i32,
    },
    /// The error does not unwrap to an OS errno; node-fatal.
    Unclassified(FaultError),
}

impl SendFault {
    /// Returns `true` unless the fault is transient.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SendFault::Transient { .. })
    }

    /// Returns the OS error number, if one was found.
    pub fn errno(&self) -> Option<i32> {
        match self {
            SendFault::Transient { errno } | SendFault::Fatal { errno } => Some(*errno),
            SendFault::Unclassified(_) => None,
        }
    }
}

/// Returns `true` if `errno` is in [`BENIGN_SEND_ERRNOS`].
#[inline]
pub fn is_benign_errno(errno: i32) -> bool {
    BENIGN_SEND_ERRNOS.contains(&errno)
}

/// Unwraps `err` down to an OS error number.
///
/// Looks at `err` and then its `source()` chain for a [`io::Error`]. Custom
/// I/O errors are looked through via [`io::Error::get_ref`]. The first I/O error
/// carrying a raw OS error wins.
pub fn os_errno(err: &(dyn Error + 'static)) -> Result<i32, FaultError> {
    let mut kind: Option<io::ErrorKind> = None;
    let mut cur: Option<&(dyn Error + 'static)> = Some(err);

    while let Some(e) = cur {
        cur = match e.downcast_ref::<io::Error>() {
            Some(io_err) => {
                if let Some(code) = io_err.raw_os_error() {
                    return Ok(code);
                }
                kind.get_or_insert(io_err.kind());
                io_err.get_ref().map(|inner| inner as &(dyn Error + 'static))
            }
            None => e.source(),
        };
    }

    match kind {
        Some(kind) => Err(FaultError::NoErrno { kind }),
        None => Err(FaultError::NotIo),
    }
}

/// Classifies a link send fault.
///
/// # Example
/// ```
/// use std::io;
/// use tunvisor::{SendFault, classify_send_fault};
///
/// let err = io::Error::other("not an os error");
/// let fault = classify_send_fault(&err);
/// assert!(matches!(fault, SendFault::Unclassified(_)));
/// assert!(fault.is_fatal());
/// ```
pub fn classify_send_fault(err: &(dyn Error + 'static)) -> SendFault {
    match os_errno(err) {
        Ok(errno) if is_benign_errno(errno) => SendFault::Transient { errno },
        Ok(errno) => SendFault::Fatal { errno },
        Err(e) => SendFault::Unclassified(e),
    }
}
