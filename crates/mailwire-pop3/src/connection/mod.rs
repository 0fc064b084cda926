//! POP3 client state machine.

mod client;

pub use client::Pop3;

use mailwire_core::OpState;

/// Phase of a command/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queue the command line.
    Send,
    /// Drain the write buffer.
    Flush,
    /// Read the status line.
    Status,
    /// Read the dot-terminated body.
    Body,
}

/// Phase of STLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPhase {
    /// STLS command exchange.
    Command(Phase),
    /// Rewrap the carrier.
    Upgrade,
    /// TLS handshake.
    Handshake,
}

/// Operation in flight on a POP3 session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready for the next operation.
    Idle,
    /// Waiting for the greeting.
    Greeting,
    /// CAPA.
    Capa(Phase),
    /// STLS.
    Stls(TlsPhase),
    /// USER.
    User(Phase),
    /// PASS.
    Pass(Phase),
    /// APOP.
    Apop(Phase),
    /// STAT.
    Stat(Phase),
    /// LIST for one message.
    List(Phase),
    /// LIST for the whole maildrop.
    ListAll(Phase),
    /// UIDL for one message.
    Uidl(Phase),
    /// UIDL for the whole maildrop.
    UidlAll(Phase),
    /// RETR.
    Retr(Phase),
    /// TOP.
    Top(Phase),
    /// DELE.
    Dele(Phase),
    /// RSET.
    Rset(Phase),
    /// NOOP.
    Noop(Phase),
    /// QUIT.
    Quit(Phase),
    /// Latched after a fatal error.
    Error,
}

impl State {
    /// Returns the exchange phase of a plain command state.
    #[must_use]
    pub const fn phase(self) -> Option<Phase> {
        match self {
            Self::Capa(p)
            | Self::Stls(TlsPhase::Command(p))
            | Self::User(p)
            | Self::Pass(p)
            | Self::Apop(p)
            | Self::Stat(p)
            | Self::List(p)
            | Self::ListAll(p)
            | Self::Uidl(p)
            | Self::UidlAll(p)
            | Self::Retr(p)
            | Self::Top(p)
            | Self::Dele(p)
            | Self::Rset(p)
            | Self::Noop(p)
            | Self::Quit(p) => Some(p),
            _ => None,
        }
    }
}

impl OpState for State {
    const IDLE: Self = Self::Idle;
    const ERROR: Self = Self::Error;
}
