//! Protocol transcript.
//!
//! A [`Transcript`] sits on the carrier and mirrors traffic one line at a
//! time to a [`TranscriptSink`]. Client bytes are mirrored as the transport
//! accepts them, server bytes as the session consumes them, so each side is
//! recorded at the level in force for it. Client lines are prefixed with
//! `C: ` and server lines with `S: `.
//!
//! The protocol code raises the [`Level`] around credentials and message
//! payloads. Unless the [`TraceMask`] says otherwise, secrets are masked and
//! payloads collapse to a single `(data...)` line.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives finished transcript lines.
pub trait TranscriptSink: Send {
    /// Called once per line, prefix included and terminator stripped.
    fn line(&mut self, line: &str);
}

/// Emits transcript lines as `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TranscriptSink for TracingSink {
    fn line(&mut self, line: &str) {
        tracing::debug!(target: "mailwire::transcript", "{line}");
    }
}

/// Writes transcript lines to any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TranscriptSink for WriterSink<W> {
    fn line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.writer, "{line}") {
            tracing::warn!(?e, "transcript sink write failed");
        }
    }
}

/// Collects transcript lines in memory. Clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TranscriptSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Sensitivity of the bytes currently crossing the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Ordinary protocol traffic.
    #[default]
    Normal,
    /// Credentials: passwords, SASL responses.
    Secure,
    /// Message payloads.
    Payload,
}

/// Categories of traffic shown verbatim instead of being hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceMask {
    /// Show credentials.
    pub secure: bool,
    /// Show message payloads.
    pub payload: bool,
}

impl TraceMask {
    /// Shows everything.
    pub const ALL: Self = Self {
        secure: true,
        payload: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Client,
    Server,
}

impl Side {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Client => "C: ",
            Self::Server => "S: ",
        }
    }
}

#[derive(Debug, Default)]
struct Partial {
    bytes: Vec<u8>,
    payload_noted: bool,
}

/// Line-buffering mirror of the carrier's traffic.
pub struct Transcript {
    sink: Box<dyn TranscriptSink>,
    mask: TraceMask,
    level: Level,
    client: Partial,
    server: Partial,
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("mask", &self.mask)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Transcript {
    /// Creates a transcript writing to `sink`.
    pub fn new(sink: impl TranscriptSink + 'static, mask: TraceMask) -> Self {
        Self {
            sink: Box::new(sink),
            mask,
            level: Level::Normal,
            client: Partial::default(),
            server: Partial::default(),
        }
    }

    /// Returns the current level.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Switches the level, returning the previous one.
    pub fn set_level(&mut self, level: Level) -> Level {
        if level != self.level {
            self.client.payload_noted = false;
            self.server.payload_noted = false;
        }
        std::mem::replace(&mut self.level, level)
    }

    /// Mirrors bytes the client wrote.
    pub fn sent(&mut self, data: &[u8]) {
        self.mirror(Side::Client, data);
    }

    /// Mirrors bytes the server sent.
    pub fn received(&mut self, data: &[u8]) {
        self.mirror(Side::Server, data);
    }

    /// Emits any unterminated lines still held.
    pub fn finish(&mut self) {
        for side in [Side::Client, Side::Server] {
            let partial = self.partial(side);
            if !partial.bytes.is_empty() {
                let line = std::mem::take(&mut partial.bytes);
                self.emit(side, &line);
            }
        }
    }

    fn partial(&mut self, side: Side) -> &mut Partial {
        match side {
            Side::Client => &mut self.client,
            Side::Server => &mut self.server,
        }
    }

    fn mirror(&mut self, side: Side, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if self.level == Level::Payload && !self.mask.payload {
            let partial = self.partial(side);
            if partial.payload_noted {
                return;
            }
            partial.payload_noted = true;
            let line = format!("{}(data...)", side.prefix());
            self.sink.line(&line);
            return;
        }

        let mut rest = data;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let partial = self.partial(side);
            partial.bytes.extend_from_slice(&rest[..pos]);
            let line = std::mem::take(&mut partial.bytes);
            self.emit(side, &line);
            rest = &rest[pos + 1..];
        }
        self.partial(side).bytes.extend_from_slice(rest);
    }

    fn emit(&mut self, side: Side, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let text = String::from_utf8_lossy(raw);
        let text = if side == Side::Client && self.level == Level::Secure && !self.mask.secure {
            mask_secret(&text)
        } else {
            text.into_owned()
        };
        let line = format!("{}{text}", side.prefix());
        self.sink.line(&line);
    }
}

/// Hides the credential part of a client line.
fn mask_secret(line: &str) -> String {
    let words: Vec<&str> = line.split(' ').collect();
    let is = |i: usize, keyword: &str| words.get(i).is_some_and(|w| w.eq_ignore_ascii_case(keyword));
    if is(0, "PASS") {
        format!("{} ***", words[0])
    } else if is(0, "AUTHINFO") && is(1, "PASS") {
        format!("{} {} ***", words[0], words[1])
    } else if is(1, "LOGIN") && words.len() > 2 {
        format!("{} {} {} \"***\"", words[0], words[1], words[2])
    } else if is(0, "AUTH") {
        if words.len() > 2 {
            format!("{} {} ***", words[0], words[1])
        } else {
            line.to_string()
        }
    } else if is(1, "AUTHENTICATE") && words.len() > 3 {
        format!("{} {} {} ***", words[0], words[1], words[2])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(mask: TraceMask) -> (Transcript, MemorySink) {
        let sink = MemorySink::new();
        (Transcript::new(sink.clone(), mask), sink)
    }

    #[test]
    fn prefixes_each_direction() {
        let (mut t, sink) = transcript(TraceMask::default());
        t.sent(b"EHLO client.example\r\n");
        t.received(b"250-mail.example\r\n250 PIPELINING\r\n");
        assert_eq!(
            sink.lines(),
            vec![
                "C: EHLO client.example",
                "S: 250-mail.example",
                "S: 250 PIPELINING"
            ]
        );
    }

    #[test]
    fn partial_lines_join_across_calls() {
        let (mut t, sink) = transcript(TraceMask::default());
        t.sent(b"NO");
        assert!(sink.lines().is_empty());
        t.sent(b"OP\r\n");
        assert_eq!(sink.lines(), vec!["C: NOOP"]);
    }

    #[test]
    fn secure_level_masks_passwords() {
        let (mut t, sink) = transcript(TraceMask::default());
        t.set_level(Level::Secure);
        t.sent(b"PASS hunter2\r\n");
        t.sent(b"A0002 LOGIN alice hunter2\r\n");
        t.sent(b"AUTHINFO PASS hunter2\r\n");
        t.sent(b"dXNlcg==\r\n");
        t.set_level(Level::Normal);
        t.received(b"+OK\r\n");
        assert_eq!(
            sink.lines(),
            vec![
                "C: PASS ***",
                "C: A0002 LOGIN alice \"***\"",
                "C: AUTHINFO PASS ***",
                "C: ***",
                "S: +OK"
            ]
        );
    }

    #[test]
    fn secure_mask_shows_credentials() {
        let (mut t, sink) = transcript(TraceMask {
            secure: true,
            payload: false,
        });
        t.set_level(Level::Secure);
        t.sent(b"PASS hunter2\r\n");
        assert_eq!(sink.lines(), vec!["C: PASS hunter2"]);
    }

    #[test]
    fn payload_collapses_to_marker() {
        let (mut t, sink) = transcript(TraceMask::default());
        t.set_level(Level::Payload);
        t.sent(b"Subject: hi\r\n\r\n");
        t.sent(b"body\r\n.\r\n");
        t.set_level(Level::Normal);
        t.received(b"250 OK\r\n");
        assert_eq!(sink.lines(), vec!["C: (data...)", "S: 250 OK"]);
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_sink_emits_debug_events() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || TracingSink.line("C: NOOP"));

        let bytes = capture.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let out = String::from_utf8_lossy(&bytes).into_owned();
        assert!(out.contains("mailwire::transcript"), "{out}");
        assert!(out.contains("C: NOOP"), "{out}");
    }

    #[test]
    fn writer_sink_appends_newlines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.line("C: QUIT");
        assert_eq!(sink.into_inner(), b"C: QUIT\n");
    }
}
