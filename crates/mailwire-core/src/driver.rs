//! Async re-invocation loop for the non-blocking state machines.
//!
//! The protocol clients never wait. [`Driver::run`] calls an operation, and
//! whenever it returns [`Error::WouldBlock`] waits for the socket to become
//! ready in the direction the session blocked on before calling it again.

use std::future::Future;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::config::Config;
use crate::line::Direction;
use crate::session::{OpState, Session};
use crate::{Error, Result};

/// A stream that can report readiness.
pub trait Readiness {
    /// Resolves once the stream is ready in `direction`.
    fn ready(&self, direction: Direction) -> impl Future<Output = io::Result<()>> + Send;
}

/// A protocol client built on a [`Session`].
pub trait Client {
    /// Raw transport type.
    type Stream: Read + Write;
    /// Operation state type.
    type State: OpState;

    /// Returns the session.
    fn session(&self) -> &Session<Self::Stream, Self::State>;

    /// Returns the session mutably.
    fn session_mut(&mut self) -> &mut Session<Self::Stream, Self::State>;
}

/// Drives operations to completion over a readiness-capable stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Driver {
    io_timeout: Option<Duration>,
}

impl Driver {
    /// Creates a driver with the given readiness timeout.
    #[must_use]
    pub const fn new(io_timeout: Option<Duration>) -> Self {
        Self { io_timeout }
    }

    /// Creates a driver using [`Config::io_timeout`].
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.io_timeout)
    }

    /// Runs `op` until it stops returning [`Error::WouldBlock`].
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or [`Error::Timeout`] (which latches
    /// the session) if the socket stays unready past the I/O timeout.
    pub async fn run<C, T, F>(&self, client: &mut C, mut op: F) -> Result<T>
    where
        C: Client,
        C::Stream: Readiness,
        F: FnMut(&mut C) -> Result<T>,
    {
        loop {
            match op(client) {
                Err(Error::WouldBlock) => self.wait(client).await?,
                other => return other,
            }
        }
    }

    async fn wait<C>(&self, client: &mut C) -> Result<()>
    where
        C: Client,
        C::Stream: Readiness,
    {
        let session = client.session();
        let direction = session.blocked_on();
        let carrier = session
            .carrier()
            .ok_or_else(|| Error::Usage("no carrier stream attached".into()))?;
        let ready = carrier.get_ref().ready(direction);

        let outcome = match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, ready)
                .await
                .map_err(|_| Error::Timeout(limit)),
            None => Ok(ready.await),
        };
        match outcome {
            Ok(ready) => ready.map_err(Error::from),
            Err(err) => {
                client.session_mut().latch(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::carrier::Carrier;
    use crate::config::{Protocol, Security};
    use crate::net::{self, TcpSocket};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        Idle,
        Echo(bool),
        Error,
    }

    impl OpState for State {
        const IDLE: Self = Self::Idle;
        const ERROR: Self = Self::Error;
    }

    struct Echo {
        session: Session<TcpSocket, State>,
    }

    impl Client for Echo {
        type Stream = TcpSocket;
        type State = State;

        fn session(&self) -> &Session<TcpSocket, State> {
            &self.session
        }

        fn session_mut(&mut self) -> &mut Session<TcpSocket, State> {
            &mut self.session
        }
    }

    impl Echo {
        fn ping(&mut self) -> Result<String> {
            self.session.begin(State::Echo(false))?;
            let result = self.ping_step();
            self.session.settle(result)
        }

        fn ping_step(&mut self) -> Result<String> {
            if self.session.state() == State::Echo(false) {
                self.session.queue_line("PING");
                self.session.advance(State::Echo(true));
            }
            self.session.flush()?;
            self.session.read_line()
        }
    }

    async fn loopback() -> (TcpListener, Carrier<TcpSocket>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config::builder(Protocol::Nntp, "127.0.0.1")
            .port(listener.local_addr().unwrap().port())
            .security(Security::None)
            .build();
        let carrier = net::connect(&config).await.unwrap();
        (listener, carrier)
    }

    #[tokio::test]
    async fn test_run_waits_for_reply() {
        let (listener, carrier) = loopback().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 6];
            sock.read_exact(&mut buf).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            sock.write_all(b"PONG\r\n").await.unwrap();
            buf
        });

        let mut echo = Echo {
            session: Session::with_carrier(carrier),
        };
        let driver = Driver::new(Some(Duration::from_secs(5)));
        let reply = driver.run(&mut echo, Echo::ping).await.unwrap();
        assert_eq!(reply, "PONG");
        assert!(echo.session.is_idle());
        assert_eq!(&server.await.unwrap(), b"PING\r\n");
    }

    #[tokio::test]
    async fn test_timeout_latches() {
        let (listener, carrier) = loopback().await;
        let _server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(sock);
        });

        let mut echo = Echo {
            session: Session::with_carrier(carrier),
        };
        let driver = Driver::new(Some(Duration::from_millis(50)));
        let err = driver.run(&mut echo, Echo::ping).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(echo.session.is_latched());
        assert!(matches!(echo.ping(), Err(Error::Latched)));
    }
}
