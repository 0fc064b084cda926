//! Per-connection session state shared by every protocol client.
//!
//! A protocol client wraps a [`Session`] and codes each operation as an
//! explicit state machine over its own `State` enum:
//!
//! ```ignore
//! pub fn noop(&mut self) -> Result<()> {
//!     self.session.begin(State::Noop(Phase::Send))?;
//!     let result = self.noop_step();
//!     self.session.settle(result)
//! }
//! ```
//!
//! [`Session::begin`] enforces the one-outstanding-command rule and the error
//! latch, and [`Session::settle`] decides from the step's result whether the
//! operation finished, must be re-invoked, or killed the session.

use std::fmt;
use std::io::{Read, Write};
use std::mem;
use std::sync::Arc;

use rustls::ClientConfig;

use crate::capability::CapabilitySet;
use crate::carrier::Carrier;
use crate::dot;
use crate::flags::SessionFlags;
use crate::line::{Direction, LineIo};
use crate::transcript::{Level, TraceMask, Transcript, TranscriptSink};
use crate::{Error, Result};

/// Operation state of a protocol client.
///
/// `IDLE` and `ERROR` must be unit variants; every other variant names one
/// operation and usually carries that operation's phase.
pub trait OpState: fmt::Debug + Copy {
    /// No operation in flight.
    const IDLE: Self;
    /// Terminal state after a fatal failure.
    const ERROR: Self;
}

/// Status and text of the most recent final reply line, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastReply {
    /// Status token: `250`, `+OK`, `-ERR`, `OK`, `NO`, ...
    pub status: String,
    /// Text after the status token.
    pub text: String,
}

/// A protocol session over stream `S` with operation state `St`.
#[derive(Debug)]
pub struct Session<S: Read + Write, St> {
    carrier: Option<Carrier<S>>,
    state: St,
    flags: SessionFlags,
    io: LineIo,
    last_reply: Option<LastReply>,
    capabilities: Option<CapabilitySet>,
    pending: Vec<String>,
    payload: Vec<u8>,
}

impl<S: Read + Write, St: OpState> Default for Session<S, St> {
    fn default() -> Self {
        Self {
            carrier: None,
            state: St::IDLE,
            flags: SessionFlags::empty(),
            io: LineIo::default(),
            last_reply: None,
            capabilities: None,
            pending: Vec::new(),
            payload: Vec::new(),
        }
    }
}

fn no_carrier() -> Error {
    Error::Usage("no carrier stream attached".into())
}

impl<S: Read + Write, St: OpState> Session<S, St> {
    /// Creates an empty session with no carrier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current operation state.
    pub const fn state(&self) -> St {
        self.state
    }

    /// Returns true if no operation is in flight.
    pub fn is_idle(&self) -> bool {
        mem::discriminant(&self.state) == mem::discriminant(&St::IDLE)
    }

    /// Returns true if the error latch is set.
    pub const fn is_latched(&self) -> bool {
        self.flags.contains(SessionFlags::ERROR)
    }

    /// Returns the session flags.
    pub const fn flags(&self) -> SessionFlags {
        self.flags
    }

    /// Sets or clears `flags`.
    pub fn set_flags(&mut self, flags: SessionFlags, on: bool) {
        self.flags.set(flags, on);
    }

    /// Returns the most recent final reply.
    pub const fn last_reply(&self) -> Option<&LastReply> {
        self.last_reply.as_ref()
    }

    /// Records the most recent final reply.
    pub fn set_last_reply(&mut self, status: impl Into<String>, text: impl Into<String>) {
        self.last_reply = Some(LastReply {
            status: status.into(),
            text: text.into(),
        });
    }

    /// Returns the cached capability set, if any.
    pub const fn capabilities(&self) -> Option<&CapabilitySet> {
        self.capabilities.as_ref()
    }

    /// Installs a freshly parsed capability set.
    pub fn set_capabilities(&mut self, capabilities: CapabilitySet) {
        tracing::debug!(count = capabilities.len(), "capabilities refreshed");
        self.capabilities = Some(capabilities);
    }

    /// Discards the cached capability set.
    pub fn invalidate_capabilities(&mut self) {
        self.capabilities = None;
    }

    /// Continuation lines collected so far for the current reply.
    pub fn pending_mut(&mut self) -> &mut Vec<String> {
        &mut self.pending
    }

    /// Takes the collected continuation lines.
    pub fn take_pending(&mut self) -> Vec<String> {
        mem::take(&mut self.pending)
    }

    /// Body bytes collected so far for the current reply.
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// Takes the collected body bytes.
    pub fn take_payload(&mut self) -> Vec<u8> {
        mem::take(&mut self.payload)
    }

    /// Returns the buffered I/O adapter.
    pub const fn io(&self) -> &LineIo {
        &self.io
    }

    /// Direction the last `WouldBlock` was reported on.
    pub const fn blocked_on(&self) -> Direction {
        self.io.blocked_on()
    }

    /// Returns the attached carrier.
    pub const fn carrier(&self) -> Option<&Carrier<S>> {
        self.carrier.as_ref()
    }

    /// Returns the attached carrier mutably.
    pub fn carrier_mut(&mut self) -> Option<&mut Carrier<S>> {
        self.carrier.as_mut()
    }

    /// Enters operation `initial`, or resumes it if it is already in flight.
    ///
    /// # Errors
    ///
    /// [`Error::Latched`] if the error latch is set, [`Error::Usage`] if no
    /// carrier is attached or a different operation is in flight.
    pub fn begin(&mut self, initial: St) -> Result<()> {
        if self.is_latched() {
            return Err(Error::Latched);
        }
        if self.carrier.is_none() {
            return Err(no_carrier());
        }
        if self.is_idle() {
            tracing::debug!(op = ?initial, "operation started");
            self.state = initial;
            self.pending.clear();
            self.payload.clear();
            return Ok(());
        }
        if mem::discriminant(&self.state) == mem::discriminant(&initial) {
            return Ok(());
        }
        Err(Error::Usage(format!(
            "{:?} is still in progress",
            self.state
        )))
    }

    /// Records a phase transition of the operation in flight.
    pub fn advance(&mut self, next: St) {
        self.state = next;
    }

    /// Settles the operation according to the result of its step.
    ///
    /// # Errors
    ///
    /// Returns `result` unchanged.
    pub fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Err(Error::WouldBlock) => {}
            Err(e) if e.is_fatal() => self.latch(e),
            Ok(_) => {
                tracing::debug!(op = ?self.state, "operation finished");
                self.finish();
            }
            Err(e) => {
                tracing::debug!(op = ?self.state, error = %e, "operation failed");
                self.finish();
            }
        }
        result
    }

    fn finish(&mut self) {
        self.state = St::IDLE;
        self.flags.remove(SessionFlags::MULTILINE);
        self.set_trace_level(Level::Normal);
    }

    /// Latches the session into its error state.
    pub fn latch(&mut self, err: &Error) {
        tracing::warn!(op = ?self.state, error = %err, "session latched");
        self.state = St::ERROR;
        self.flags.insert(SessionFlags::ERROR);
        self.flags.remove(SessionFlags::MULTILINE);
    }

    /// Queues bytes for the carrier.
    pub fn queue(&mut self, data: &[u8]) {
        self.io.queue(data);
    }

    /// Queues a command line, appending CRLF.
    pub fn queue_line(&mut self, line: &str) {
        self.io.queue(line.as_bytes());
        self.io.queue(b"\r\n");
    }

    /// Sets the transcript level, returning the previous one.
    pub fn set_trace_level(&mut self, level: Level) -> Level {
        self.carrier
            .as_mut()
            .map_or(Level::Normal, |c| c.set_trace_level(level))
    }

    /// Returns true if received bytes are waiting to be consumed.
    pub fn has_buffered_input(&self) -> bool {
        self.io.has_buffered_input()
    }
}

impl<S: Read + Write, St: OpState> Session<S, St> {
    /// Creates a session bound to `carrier`.
    #[must_use]
    pub fn with_carrier(carrier: Carrier<S>) -> Self {
        let mut session = Self::new();
        session.set_carrier(carrier);
        session
    }

    /// Installs a new carrier, resetting all per-connection state.
    ///
    /// This is the only way to release the error latch. The previous carrier,
    /// if any, is returned.
    pub fn set_carrier(&mut self, carrier: Carrier<S>) -> Option<Carrier<S>> {
        let mut flags = SessionFlags::empty();
        flags.set(SessionFlags::TLS, carrier.is_tls());
        flags.set(SessionFlags::TRACE, carrier.has_transcript());
        let previous = self.carrier.replace(carrier);
        self.state = St::IDLE;
        self.flags = flags;
        self.io.clear();
        self.last_reply = None;
        self.capabilities = None;
        self.pending.clear();
        self.payload.clear();
        previous
    }

    /// Detaches and returns the carrier. Any in-flight operation is abandoned.
    pub fn disconnect(&mut self) -> Option<Carrier<S>> {
        let carrier = self.carrier.take();
        self.state = St::IDLE;
        self.flags = SessionFlags::empty();
        self.io.clear();
        self.capabilities = None;
        self.pending.clear();
        self.payload.clear();
        carrier
    }

    /// Drains the write buffer.
    ///
    /// # Errors
    ///
    /// See [`LineIo::flush`].
    pub fn flush(&mut self) -> Result<()> {
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        self.io.flush(carrier)
    }

    /// Reads one text line.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line`].
    pub fn read_line(&mut self) -> Result<String> {
        let bytes = self.read_line_bytes()?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Reads one raw line.
    ///
    /// The line reaches the transcript now, at the level in force, not when
    /// its bytes arrived.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line_bytes`].
    pub fn read_line_bytes(&mut self) -> Result<Vec<u8>> {
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        let line = self.io.read_line_bytes(carrier)?;
        if carrier.has_transcript() {
            carrier.record_received(&line);
            carrier.record_received(b"\n");
        }
        Ok(line)
    }

    /// Reads exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_exact`].
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        let data = self.io.read_exact(carrier, n)?;
        carrier.record_received(&data);
        Ok(data)
    }

    /// Reads a dot-terminated body, un-stuffing leading dots.
    ///
    /// Lines are joined with CRLF. Lines already read survive `WouldBlock`.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line_bytes`].
    pub fn read_dot_body(&mut self) -> Result<Vec<u8>> {
        self.flags.insert(SessionFlags::MULTILINE);
        loop {
            let line = self.read_line_bytes()?;
            match dot::unstuff(&line) {
                None => {
                    self.flags.remove(SessionFlags::MULTILINE);
                    return Ok(self.take_payload());
                }
                Some(data) => {
                    self.payload.extend_from_slice(data);
                    self.payload.extend_from_slice(b"\r\n");
                }
            }
        }
    }

    /// Reads a dot-terminated list of text lines.
    ///
    /// # Errors
    ///
    /// See [`LineIo::read_line`].
    pub fn read_dot_lines(&mut self) -> Result<Vec<String>> {
        self.flags.insert(SessionFlags::MULTILINE);
        loop {
            let line = self.read_line_bytes()?;
            match dot::unstuff(&line) {
                None => {
                    self.flags.remove(SessionFlags::MULTILINE);
                    return Ok(self.take_pending());
                }
                Some(data) => self
                    .pending
                    .push(String::from_utf8_lossy(data).into_owned()),
            }
        }
    }

    /// Attaches a transcript writing to `sink`.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] unless the session is idle with a carrier attached.
    pub fn enable_trace(&mut self, sink: impl TranscriptSink + 'static, mask: TraceMask) -> Result<()> {
        if !self.is_idle() {
            return Err(Error::Usage("trace can only be toggled while idle".into()));
        }
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        carrier.set_transcript(Transcript::new(sink, mask));
        self.flags.insert(SessionFlags::TRACE);
        Ok(())
    }

    /// Detaches the transcript. Buffered bytes are unaffected.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] unless the session is idle with a carrier attached.
    pub fn disable_trace(&mut self) -> Result<()> {
        if !self.is_idle() {
            return Err(Error::Usage("trace can only be toggled while idle".into()));
        }
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        carrier.take_transcript();
        self.flags.remove(SessionFlags::TRACE);
        Ok(())
    }

    /// Replaces the plaintext carrier with a TLS one after a positive
    /// STARTTLS reply.
    ///
    /// The capability cache is cleared unconditionally. On error the old
    /// carrier is gone and the caller's [`Session::settle`] latches.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the server sent data after its reply, or a TLS
    /// setup error.
    pub fn upgrade_tls(&mut self, config: Arc<ClientConfig>, server_name: &str) -> Result<()> {
        self.capabilities = None;
        if self.io.has_buffered_input() {
            self.carrier = None;
            return Err(Error::Protocol(
                "plaintext data received after STARTTLS reply".into(),
            ));
        }
        let carrier = self.carrier.take().ok_or_else(no_carrier)?;
        let carrier = carrier.upgrade(config, server_name)?;
        self.carrier = Some(carrier);
        self.flags.insert(SessionFlags::TLS);
        Ok(())
    }

    /// Drives the TLS handshake started by [`Session::upgrade_tls`].
    ///
    /// # Errors
    ///
    /// [`Error::WouldBlock`] until the handshake completes, then any
    /// handshake failure.
    pub fn drive_handshake(&mut self) -> Result<()> {
        let carrier = self.carrier.as_mut().ok_or_else(no_carrier)?;
        match carrier.complete_handshake() {
            Err(Error::WouldBlock) => {
                let direction = if carrier.wants_write() {
                    Direction::Write
                } else {
                    Direction::Read
                };
                self.io.set_blocked_on(direction);
                Err(Error::WouldBlock)
            }
            other => other,
        }
    }
}
