//! Resumable POP3 client.

use std::io::{Read, Write};
use std::sync::Arc;

use mailwire_core::net::{self, TcpSocket};
use mailwire_core::{
    CapabilitySet, Carrier, Client, Config, Error, LastReply, Level, Result, Session,
    SessionFlags, default_tls_config,
};
use rustls::ClientConfig;

use super::{Phase, State, TlsPhase};
use crate::command::Command;
use crate::parser;
use crate::types::{ListEntry, Stat, UidlEntry};

/// POP3 client over stream `S`.
///
/// Operations return [`Error::WouldBlock`] whenever the transport has to
/// wait. Call the same operation again to resume; the command is never sent
/// twice.
#[derive(Debug)]
pub struct Pop3<S: Read + Write> {
    session: Session<S, State>,
    tls: Arc<ClientConfig>,
    server_name: Option<String>,
    greeting: Option<String>,
    timestamp: Option<String>,
}

impl Pop3<TcpSocket> {
    /// Connects to the configured server. Call [`Pop3::open`] next.
    ///
    /// # Errors
    ///
    /// See [`net::connect`].
    pub async fn connect(config: &Config) -> Result<Self> {
        let carrier = net::connect(config).await?;
        Ok(Self::new(carrier).with_tls_config(config.tls_config()))
    }
}

impl<S: Read + Write> Pop3<S> {
    /// Creates a client over `carrier`.
    #[must_use]
    pub fn new(carrier: Carrier<S>) -> Self {
        Self {
            session: Session::with_carrier(carrier),
            tls: default_tls_config(),
            server_name: None,
            greeting: None,
            timestamp: None,
        }
    }

    /// Uses `config` for STLS.
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = config;
        self
    }

    /// Returns the greeting text.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Returns the APOP timestamp from the greeting, if the server sent one.
    #[must_use]
    pub fn apop_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Returns the most recent status line.
    #[must_use]
    pub const fn last_reply(&self) -> Option<&LastReply> {
        self.session.last_reply()
    }

    /// Reads the greeting and remembers its APOP timestamp.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for an `-ERR` greeting.
    pub fn open(&mut self) -> Result<String> {
        self.session.begin(State::Greeting)?;
        let result = self.open_step();
        self.session.settle(result)
    }

    fn open_step(&mut self) -> Result<String> {
        let text = self.read_status()?;
        self.timestamp = parser::apop_timestamp(&text).map(ToString::to_string);
        tracing::debug!(apop = ?self.timestamp, "POP3 greeting");
        self.greeting = Some(text.clone());
        self.session.set_flags(SessionFlags::CONNECTED, true);
        Ok(text)
    }

    /// Returns the CAPA capabilities, querying the server unless cached.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the server does not implement CAPA.
    pub fn capa(&mut self, force: bool) -> Result<&CapabilitySet> {
        if self.session.is_latched() {
            return Err(Error::Latched);
        }
        let in_flight = matches!(self.session.state(), State::Capa(_));
        if force || in_flight || self.session.capabilities().is_none() {
            self.session.begin(State::Capa(Phase::Send))?;
            if self.session.state() == State::Capa(Phase::Send) {
                self.session.invalidate_capabilities();
            }
            let result = self
                .lines_step(State::Capa, &Command::Capa, |line| Ok(line.to_string()))
                .map(|lines| self.session.set_capabilities(lines.into_iter().collect()));
            self.session.settle(result)?;
        }
        self.session
            .capabilities()
            .ok_or_else(|| Error::Protocol("no capabilities after CAPA".into()))
    }

    /// Upgrades the connection with STLS.
    ///
    /// The capability cache stays empty afterwards; call [`Pop3::capa`] again.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] unless CAPA advertised `STLS`, [`Error::Usage`]
    /// if TLS is already active. A failed upgrade or handshake latches.
    pub fn stls(&mut self, server_name: &str) -> Result<()> {
        if self.session.is_idle() {
            if self.session.flags().contains(SessionFlags::TLS) {
                return Err(Error::Usage("TLS is already active".into()));
            }
            if !self
                .session
                .capabilities()
                .is_some_and(|caps| caps.contains("STLS"))
            {
                return Err(Error::NotSupported("STLS".into()));
            }
        }
        let initial = State::Stls(TlsPhase::Command(Phase::Send));
        self.session.begin(initial)?;
        if self.session.state() == initial {
            self.server_name = Some(server_name.to_string());
        }
        let result = self.stls_step();
        self.session.settle(result)
    }

    fn stls_step(&mut self) -> Result<()> {
        if let State::Stls(TlsPhase::Command(_)) = self.session.state() {
            self.exchange(|p| State::Stls(TlsPhase::Command(p)), &Command::Stls)?;
            self.session.advance(State::Stls(TlsPhase::Upgrade));
        }
        if self.session.state() == State::Stls(TlsPhase::Upgrade) {
            let name = self.server_name.clone().unwrap_or_default();
            self.session.upgrade_tls(Arc::clone(&self.tls), &name)?;
            self.session.advance(State::Stls(TlsPhase::Handshake));
        }
        self.session.drive_handshake()
    }

    /// Sends `USER`.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] once authenticated, [`Error::Rejected`] on `-ERR`.
    pub fn user(&mut self, name: &str) -> Result<()> {
        self.check_unauthenticated()?;
        self.single(State::User, &Command::User(name.to_string()), |_| Ok(()))
    }

    /// Sends `PASS`. The password is masked in transcripts.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] once authenticated, [`Error::Rejected`] on `-ERR`.
    pub fn pass(&mut self, password: &str) -> Result<()> {
        self.check_unauthenticated()?;
        self.single(State::Pass, &Command::Pass(password.to_string()), |_| Ok(()))?;
        self.authenticated();
        Ok(())
    }

    /// Authenticates with `APOP`.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if the greeting carried no timestamp,
    /// [`Error::Rejected`] on `-ERR`.
    pub fn apop(&mut self, user: &str, secret: &str) -> Result<()> {
        self.check_unauthenticated()?;
        let digest = match &self.timestamp {
            Some(stamp) => parser::apop_digest(stamp, secret),
            None if self.session.is_idle() => return Err(Error::NotSupported("APOP".into())),
            None => String::new(),
        };
        let cmd = Command::Apop {
            user: user.to_string(),
            digest,
        };
        self.single(State::Apop, &cmd, |_| Ok(()))?;
        self.authenticated();
        Ok(())
    }

    fn check_unauthenticated(&self) -> Result<()> {
        if self.session.is_idle() && self.session.flags().contains(SessionFlags::AUTH) {
            return Err(Error::Usage("already authenticated".into()));
        }
        Ok(())
    }

    fn authenticated(&mut self) {
        self.session.set_flags(SessionFlags::AUTH, true);
        self.session.invalidate_capabilities();
    }

    /// Returns the message count and maildrop size.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn stat(&mut self) -> Result<Stat> {
        self.single(State::Stat, &Command::Stat, |text| parser::parse_stat(&text))
    }

    /// Returns the size of message `n`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if there is no such message.
    pub fn list(&mut self, n: u32) -> Result<ListEntry> {
        self.single(State::List, &Command::List(Some(n)), |text| {
            parser::parse_listing(&text)
        })
    }

    /// Returns the scan listing of every message.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn list_all(&mut self) -> Result<Vec<ListEntry>> {
        self.lines(State::ListAll, &Command::List(None), parser::parse_listing)
    }

    /// Returns the unique-id of message `n`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if there is no such message.
    pub fn uidl(&mut self, n: u32) -> Result<UidlEntry> {
        self.single(State::Uidl, &Command::Uidl(Some(n)), |text| {
            parser::parse_uidl(&text)
        })
    }

    /// Returns the unique-id listing of every message.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn uidl_all(&mut self) -> Result<Vec<UidlEntry>> {
        self.lines(State::UidlAll, &Command::Uidl(None), parser::parse_uidl)
    }

    /// Retrieves message `n`, un-stuffed, with CRLF line endings.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if there is no such message.
    pub fn retr(&mut self, n: u32) -> Result<Vec<u8>> {
        self.body(State::Retr, &Command::Retr(n))
    }

    /// Retrieves the headers of message `n` plus its first `lines` body lines.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if there is no such message.
    pub fn top(&mut self, n: u32, lines: u32) -> Result<Vec<u8>> {
        self.body(State::Top, &Command::Top(n, lines))
    }

    /// Marks message `n` as deleted.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn dele(&mut self, n: u32) -> Result<()> {
        self.single(State::Dele, &Command::Dele(n), |_| Ok(()))
    }

    /// Unmarks all deleted messages.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn rset(&mut self) -> Result<()> {
        self.single(State::Rset, &Command::Rset, |_| Ok(()))
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on `-ERR`.
    pub fn noop(&mut self) -> Result<()> {
        self.single(State::Noop, &Command::Noop, |_| Ok(()))
    }

    /// Ends the session; the server commits deletions.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the server could not remove deleted messages.
    pub fn quit(&mut self) -> Result<String> {
        let text = self.single(State::Quit, &Command::Quit, Ok)?;
        self.session.set_flags(SessionFlags::CONNECTED, false);
        Ok(text)
    }

    fn single<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        parse: impl FnOnce(String) -> Result<T>,
    ) -> Result<T> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.exchange(wrap, cmd).and_then(parse);
        self.session.settle(result)
    }

    fn lines<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.lines_step(wrap, cmd, parse);
        self.session.settle(result)
    }

    fn lines_step<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.exchange(wrap, cmd)?;
        self.session
            .read_dot_lines()?
            .iter()
            .map(|line| parse(line))
            .collect()
    }

    fn body(&mut self, wrap: fn(Phase) -> State, cmd: &Command) -> Result<Vec<u8>> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.exchange(wrap, cmd).and_then(|_| {
            self.session.set_trace_level(Level::Payload);
            self.session.read_dot_body()
        });
        self.session.settle(result)
    }

    /// Runs the command/status exchange from the current phase.
    ///
    /// Multi-line commands end in [`Phase::Body`]; resuming there returns
    /// an empty text since the status line was already consumed.
    fn exchange(&mut self, wrap: impl Fn(Phase) -> State, cmd: &Command) -> Result<String> {
        let mut phase = self.session.state().phase().unwrap_or(Phase::Send);
        if phase == Phase::Send {
            let line = cmd.serialize()?;
            if cmd.is_secret() {
                self.session.set_trace_level(Level::Secure);
            }
            self.session.queue(&line);
            phase = Phase::Flush;
            self.session.advance(wrap(phase));
        }
        if phase == Phase::Flush {
            self.session.flush()?;
            self.session.set_trace_level(Level::Normal);
            phase = Phase::Status;
            self.session.advance(wrap(phase));
        }
        if phase == Phase::Body {
            return Ok(String::new());
        }
        let text = self.read_status()?;
        if cmd.is_multiline() {
            self.session.advance(wrap(Phase::Body));
        }
        Ok(text)
    }

    fn read_status(&mut self) -> Result<String> {
        let line = self.session.read_line()?;
        let status = parser::parse_status(&line)?;
        self.session
            .set_last_reply(status.indicator(), status.text.clone());
        status.into_result()
    }
}

impl<S: Read + Write> Client for Pop3<S> {
    type Stream = S;
    type State = State;

    fn session(&self) -> &Session<S, State> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<S, State> {
        &mut self.session
    }
}
