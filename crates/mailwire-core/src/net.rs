//! TCP transport for the state machines.

use std::io::{self, Read, Write};

use tokio::io::Interest;
use tokio::net::TcpStream;

use crate::carrier::Carrier;
use crate::config::{Config, Security};
use crate::driver::Readiness;
use crate::line::Direction;
use crate::transcript::{TracingSink, Transcript};
use crate::{Error, Result};

/// A tokio TCP stream behind the non-blocking `Read`/`Write` contract.
///
/// Reads and writes never wait; they map to `try_read`/`try_write` and
/// report `WouldBlock` when the socket is not ready.
#[derive(Debug)]
pub struct TcpSocket {
    stream: TcpStream,
}

impl TcpSocket {
    /// Wraps a connected stream.
    #[must_use]
    pub const fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Returns the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    /// Consumes the socket, returning the underlying stream.
    #[must_use]
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl Read for TcpSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }
}

impl Write for TcpSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Readiness for TcpSocket {
    async fn ready(&self, direction: Direction) -> io::Result<()> {
        let interest = match direction {
            Direction::Read => Interest::READABLE,
            Direction::Write => Interest::WRITABLE,
        };
        self.stream.ready(interest).await.map(|_| ())
    }
}

/// Connects to the configured server.
///
/// With [`Security::Implicit`] the carrier is TLS-wrapped immediately; the
/// handshake runs as part of the first read or write. A transcript with a
/// [`TracingSink`] is attached when [`Config::trace`] is set.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the connection is not established within
/// `connect_timeout`, or the connect/TLS setup error.
pub async fn connect(config: &Config) -> Result<Carrier<TcpSocket>> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::debug!(%addr, security = ?config.security, "connecting");

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))??;
    stream.set_nodelay(true)?;

    let socket = TcpSocket::from_stream(stream);
    let mut carrier = match config.security {
        Security::Implicit => Carrier::tls(socket, config.tls_config(), &config.host)?,
        Security::None | Security::StartTls => Carrier::new(socket),
    };
    if let Some(mask) = config.trace {
        carrier.set_transcript(Transcript::new(TracingSink, mask));
    }
    Ok(carrier)
}
