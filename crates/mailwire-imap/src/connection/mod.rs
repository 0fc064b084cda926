//! IMAP client state machine.

mod client;

pub use client::Imap;

use mailwire_core::OpState;

/// Phase of a tagged command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tag and queue the command.
    Send,
    /// Drain the write buffer.
    Flush,
    /// Read response frames until the tagged completion.
    Response,
}

/// Phase of STARTTLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPhase {
    /// STARTTLS command exchange.
    Command(Phase),
    /// Rewrap the carrier.
    Upgrade,
    /// TLS handshake.
    Handshake,
}

/// Operation in flight on an IMAP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready for the next operation.
    Idle,
    /// Waiting for the greeting.
    Greeting,
    /// CAPABILITY.
    Capability(Phase),
    /// STARTTLS.
    StartTls(TlsPhase),
    /// LOGIN.
    Login(Phase),
    /// SELECT.
    Select(Phase),
    /// EXAMINE.
    Examine(Phase),
    /// LIST.
    List(Phase),
    /// STATUS.
    Status(Phase),
    /// STORE.
    Store(Phase),
    /// FETCH.
    Fetch(Phase),
    /// EXPUNGE.
    Expunge(Phase),
    /// CLOSE.
    Close(Phase),
    /// NOOP.
    Noop(Phase),
    /// LOGOUT.
    Logout(Phase),
    /// Latched after a fatal error.
    Error,
}

impl State {
    /// Returns the exchange phase of a command state.
    #[must_use]
    pub const fn phase(self) -> Option<Phase> {
        match self {
            Self::Capability(p)
            | Self::StartTls(TlsPhase::Command(p))
            | Self::Login(p)
            | Self::Select(p)
            | Self::Examine(p)
            | Self::List(p)
            | Self::Status(p)
            | Self::Store(p)
            | Self::Fetch(p)
            | Self::Expunge(p)
            | Self::Close(p)
            | Self::Noop(p)
            | Self::Logout(p) => Some(p),
            _ => None,
        }
    }
}

impl OpState for State {
    const IDLE: Self = Self::Idle;
    const ERROR: Self = Self::Error;
}
