//! Error types shared by every mailwire protocol client.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving a protocol session.
///
/// The variants fall into the classes callers need to tell apart:
///
/// - [`Error::WouldBlock`] is not a failure. The operation kept its state and
///   must be invoked again once the transport is ready.
/// - [`Error::Rejected`] is a well-formed negative reply (`-ERR`, `5xx`,
///   `NO`, `BAD`). The session stays usable.
/// - [`Error::Usage`] and [`Error::NotSupported`] are detected before any I/O.
/// - Everything for which [`Error::is_fatal`] returns `true` latches the
///   session; afterwards every call returns [`Error::Latched`].
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not complete the request right now.
    #[error("operation would block")]
    WouldBlock,

    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// The peer closed the connection (zero-length read or write).
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Malformed or unexpected data from the server.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered with a negative reply.
    #[error("server rejected command: {status} {text}")]
    Rejected {
        /// Status token as sent by the server (`550`, `-ERR`, `NO`, ...).
        status: String,
        /// Reply text, verbatim.
        text: String,
    },

    /// Operation invoked out of sequence.
    #[error("usage error: {0}")]
    Usage(String),

    /// The session is latched in its error state.
    #[error("session is in a latched error state")]
    Latched,

    /// A buffer could not grow.
    #[error("out of memory growing I/O buffer")]
    NoMemory,

    /// TLS setup or handshake error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Feature not advertised by the server.
    #[error("server does not support {0}")]
    NotSupported(String),

    /// Waiting for the transport timed out.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Creates a negative-reply error.
    #[must_use]
    pub fn rejected(status: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Rejected {
            status: status.into(),
            text: text.into(),
        }
    }

    /// Returns true if the operation should simply be retried later.
    #[must_use]
    pub const fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    /// Returns true for a well-formed negative server reply.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if this error leaves the session unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ConnectionClosed
                | Self::Protocol(_)
                | Self::NoMemory
                | Self::Tls(_)
                | Self::InvalidDnsName(_)
                | Self::Timeout(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Self::WouldBlock,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_maps_from_io() {
        let err = Error::from(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(err.is_would_block());
        assert!(!err.is_fatal());
    }

    #[test]
    fn eof_maps_to_connection_closed() {
        let err = Error::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejected_is_not_fatal() {
        let err = Error::rejected("550", "mailbox unavailable");
        assert!(err.is_rejected());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "server rejected command: 550 mailbox unavailable"
        );
    }

    #[test]
    fn usage_and_latched_are_not_fatal() {
        assert!(!Error::Usage("busy".into()).is_fatal());
        assert!(!Error::Latched.is_fatal());
        assert!(Error::Protocol("bad reply".into()).is_fatal());
    }
}
