//! SMTP client state machine.

mod client;

pub use client::Smtp;

use mailwire_core::OpState;

/// Phase of a command/reply exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queue the command line.
    Send,
    /// Drain the write buffer.
    Flush,
    /// Read the reply.
    Reply,
}

/// Phase of EHLO, including the HELO fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EhloPhase {
    /// EHLO exchange.
    Ehlo(Phase),
    /// HELO exchange after the server refused EHLO.
    Helo(Phase),
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
    /// EHLO over the new channel.
    Ehlo(EhloPhase),
}

/// Phase of a SASL exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// AUTH command exchange.
    Command(Phase),
    /// Answer the `n`th 334 challenge.
    Answer(usize, Phase),
}

/// Phase of DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPhase {
    /// DATA command exchange, expecting 354.
    Command(Phase),
    /// Queue the dot-stuffed message.
    Payload,
    /// Drain the message.
    PayloadFlush,
    /// Read the final reply.
    Reply,
}

/// Operation in flight on an SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready for the next operation.
    Idle,
    /// Waiting for the 220 greeting.
    Greeting,
    /// EHLO/HELO.
    Ehlo(EhloPhase),
    /// STARTTLS.
    StartTls(TlsPhase),
    /// AUTH.
    Auth(AuthPhase),
    /// MAIL FROM.
    MailFrom(Phase),
    /// RCPT TO.
    RcptTo(Phase),
    /// DATA.
    Data(DataPhase),
    /// RSET.
    Rset(Phase),
    /// NOOP.
    Noop(Phase),
    /// QUIT.
    Quit(Phase),
    /// Latched after a fatal error.
    Error,
}

impl OpState for State {
    const IDLE: Self = Self::Idle;
    const ERROR: Self = Self::Error;
}
