//! The session's duplex byte stream.
//!
//! A [`Carrier`] owns the raw transport, optionally wrapped in TLS, and an
//! optional [`Transcript`]. Upgrading to TLS consumes the carrier and returns
//! a new one around the same raw stream, carrying the transcript over.

use std::io::{self, Read, Write};
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::transcript::{Level, Transcript};
use crate::{Error, Result};

/// Raw or TLS-wrapped transport.
#[derive(Debug)]
pub enum Transport<S: Read + Write> {
    /// Plain stream.
    Plain(S),
    /// TLS over the plain stream.
    Tls(Box<StreamOwned<ClientConnection, S>>),
}

impl<S: Read + Write> Read for Transport<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl<S: Read + Write> Write for Transport<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// Active stream plus optional transcript.
#[derive(Debug)]
pub struct Carrier<S: Read + Write> {
    transport: Transport<S>,
    transcript: Option<Transcript>,
}

impl<S: Read + Write> Carrier<S> {
    /// Wraps a plain stream.
    pub const fn new(stream: S) -> Self {
        Self {
            transport: Transport::Plain(stream),
            transcript: None,
        }
    }

    /// Wraps a stream in TLS from the start (implicit TLS).
    ///
    /// The handshake is not performed here; see [`Carrier::complete_handshake`].
    ///
    /// # Errors
    ///
    /// Returns an error if `server_name` is not a valid DNS name or the TLS
    /// client cannot be set up.
    pub fn tls(stream: S, config: Arc<ClientConfig>, server_name: &str) -> Result<Self> {
        Self::new(stream).upgrade(config, server_name)
    }

    /// Returns true if the transport is TLS-wrapped.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.transport, Transport::Tls(_))
    }

    /// Returns a reference to the raw stream.
    pub fn get_ref(&self) -> &S {
        match &self.transport {
            Transport::Plain(stream) => stream,
            Transport::Tls(tls) => &tls.sock,
        }
    }

    /// Returns a mutable reference to the raw stream.
    pub fn get_mut(&mut self) -> &mut S {
        match &mut self.transport {
            Transport::Plain(stream) => stream,
            Transport::Tls(tls) => &mut tls.sock,
        }
    }

    /// Consumes the carrier, returning the raw stream.
    pub fn into_inner(mut self) -> S {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.finish();
        }
        match self.transport {
            Transport::Plain(stream) => stream,
            Transport::Tls(tls) => tls.sock,
        }
    }

    /// Rewraps the raw stream in TLS, moving the transcript across.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if TLS is already active, or a TLS setup
    /// error. The carrier is consumed either way.
    pub fn upgrade(self, config: Arc<ClientConfig>, server_name: &str) -> Result<Self> {
        let Self {
            transport,
            transcript,
        } = self;
        let stream = match transport {
            Transport::Plain(stream) => stream,
            Transport::Tls(_) => return Err(Error::Usage("TLS is already active".into())),
        };
        let name = ServerName::try_from(server_name.to_string())?;
        let conn = ClientConnection::new(config, name)?;
        tracing::info!(server_name, "transport upgraded to TLS");
        Ok(Self {
            transport: Transport::Tls(Box::new(StreamOwned::new(conn, stream))),
            transcript,
        })
    }

    /// Returns true while the TLS handshake is still in progress.
    #[must_use]
    pub fn is_handshaking(&self) -> bool {
        match &self.transport {
            Transport::Plain(_) => false,
            Transport::Tls(tls) => tls.conn.is_handshaking(),
        }
    }

    /// Returns true if the TLS layer has records waiting to be written.
    #[must_use]
    pub fn wants_write(&self) -> bool {
        match &self.transport {
            Transport::Plain(_) => false,
            Transport::Tls(tls) => tls.conn.wants_write(),
        }
    }

    /// Drives the TLS handshake as far as the raw stream allows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBlock`] if the raw stream is not ready; check
    /// [`Carrier::wants_write`] for the direction. Any other error means the
    /// handshake failed.
    pub fn complete_handshake(&mut self) -> Result<()> {
        if let Transport::Tls(tls) = &mut self.transport {
            while tls.conn.is_handshaking() {
                let (rd, wr) = tls.conn.complete_io(&mut tls.sock)?;
                if rd == 0 && wr == 0 && tls.conn.is_handshaking() {
                    return Err(Error::ConnectionClosed);
                }
            }
            while tls.conn.wants_write() {
                tls.conn.write_tls(&mut tls.sock)?;
            }
        }
        Ok(())
    }

    /// Returns true if a transcript is attached.
    #[must_use]
    pub const fn has_transcript(&self) -> bool {
        self.transcript.is_some()
    }

    /// Attaches a transcript, returning any previous one.
    pub fn set_transcript(&mut self, transcript: Transcript) -> Option<Transcript> {
        self.transcript.replace(transcript)
    }

    /// Detaches the transcript, flushing its partial lines.
    pub fn take_transcript(&mut self) -> Option<Transcript> {
        let mut transcript = self.transcript.take()?;
        transcript.finish();
        Some(transcript)
    }

    /// Mirrors server bytes the session has consumed.
    ///
    /// Reads are not mirrored as they arrive: a single read may carry a
    /// status line together with the payload behind it, and only the
    /// caller knows which level applies to which bytes.
    pub fn record_received(&mut self, data: &[u8]) {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.received(data);
        }
    }

    /// Sets the transcript level, returning the previous one.
    pub fn set_trace_level(&mut self, level: Level) -> Level {
        self.transcript
            .as_mut()
            .map_or(Level::Normal, |t| t.set_level(level))
    }
}

impl<S: Read + Write> Read for Carrier<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.transport.read(buf)
    }
}

impl<S: Read + Write> Write for Carrier<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.transport.write(buf)?;
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.sent(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transport.flush()
    }
}

/// Builds a client TLS configuration trusting the webpki root set.
#[must_use]
pub fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}
