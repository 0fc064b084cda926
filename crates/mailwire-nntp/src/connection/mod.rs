//! NNTP client state machine.

mod client;

pub use client::Nntp;

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

/// Phase of STARTTLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPhase {
    /// STARTTLS command exchange, expecting 382.
    Command(Phase),
    /// Rewrap the carrier.
    Upgrade,
    /// TLS handshake.
    Handshake,
}

/// Phase of AUTHINFO USER/PASS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// AUTHINFO USER, expecting 381 or 281.
    User(Phase),
    /// AUTHINFO PASS, expecting 281.
    Pass(Phase),
}

/// Phase of POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostPhase {
    /// POST command exchange, expecting 340.
    Command(Phase),
    /// Queue the dot-stuffed article.
    Payload,
    /// Drain the article.
    PayloadFlush,
    /// Read the final status, expecting 240.
    Status,
}

/// Operation in flight on an NNTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready for the next operation.
    Idle,
    /// Waiting for the greeting.
    Greeting,
    /// CAPABILITIES.
    Capabilities(Phase),
    /// STARTTLS.
    StartTls(TlsPhase),
    /// MODE READER.
    ModeReader(Phase),
    /// AUTHINFO.
    Authinfo(AuthPhase),
    /// GROUP.
    Group(Phase),
    /// ARTICLE.
    Article(Phase),
    /// HEAD.
    Head(Phase),
    /// BODY.
    Body(Phase),
    /// STAT.
    Stat(Phase),
    /// NEXT.
    Next(Phase),
    /// LAST.
    Last(Phase),
    /// LIST ACTIVE.
    ListActive(Phase),
    /// DATE.
    Date(Phase),
    /// POST.
    Post(PostPhase),
    /// QUIT.
    Quit(Phase),
    /// Latched after a fatal error.
    Error,
}

impl State {
    /// Returns the exchange phase of a command state.
    #[must_use]
    pub const fn phase(self) -> Option<Phase> {
        match self {
            Self::Capabilities(p)
            | Self::StartTls(TlsPhase::Command(p))
            | Self::ModeReader(p)
            | Self::Authinfo(AuthPhase::User(p) | AuthPhase::Pass(p))
            | Self::Group(p)
            | Self::Article(p)
            | Self::Head(p)
            | Self::Body(p)
            | Self::Stat(p)
            | Self::Next(p)
            | Self::Last(p)
            | Self::ListActive(p)
            | Self::Date(p)
            | Self::Post(PostPhase::Command(p))
            | Self::Quit(p) => Some(p),
            _ => None,
        }
    }
}

impl OpState for State {
    const IDLE: Self = Self::Idle;
    const ERROR: Self = Self::Error;
}
