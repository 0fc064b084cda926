//! Resumable SMTP client.

use std::io::{Read, Write};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mailwire_core::net::{self, TcpSocket};
use mailwire_core::{
    CapabilitySet, Carrier, Client, Config, Error, LastReply, Level, Result, Session,
    SessionFlags, default_tls_config, dot,
};
use rustls::ClientConfig;

use super::{AuthPhase, DataPhase, EhloPhase, Phase, State, TlsPhase};
use crate::command::Command;
use crate::parser;
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// SMTP client over stream `S`.
///
/// Every operation may return [`Error::WouldBlock`]; call the same operation
/// again once the stream is ready. Arguments passed on a resumed call are
/// ignored once the command has been queued.
#[derive(Debug)]
pub struct Smtp<S: Read + Write> {
    session: Session<S, State>,
    tls: Arc<ClientConfig>,
    domain: Option<String>,
    server_name: Option<String>,
    greeting: Option<String>,
    sasl: Vec<String>,
}

fn expect(reply: Reply, ok: impl Fn(ReplyCode) -> bool) -> Result<Reply> {
    if ok(reply.code) {
        Ok(reply)
    } else {
        Err(reply.into_error())
    }
}

const fn simple_phase(state: State) -> Phase {
    match state {
        State::MailFrom(p) | State::RcptTo(p) | State::Rset(p) | State::Noop(p) | State::Quit(p) => p,
        _ => Phase::Send,
    }
}

impl Smtp<TcpSocket> {
    /// Connects to the configured server. Call [`Smtp::open`] next.
    ///
    /// # Errors
    ///
    /// See [`net::connect`].
    pub async fn connect(config: &Config) -> Result<Self> {
        let carrier = net::connect(config).await?;
        Ok(Self::new(carrier).with_tls_config(config.tls_config()))
    }
}

impl<S: Read + Write> Smtp<S> {
    /// Creates a client over `carrier`.
    #[must_use]
    pub fn new(carrier: Carrier<S>) -> Self {
        Self {
            session: Session::with_carrier(carrier),
            tls: default_tls_config(),
            domain: None,
            server_name: None,
            greeting: None,
            sasl: Vec::new(),
        }
    }

    /// Uses `config` for STARTTLS.
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = config;
        self
    }

    /// Returns the text of the server greeting.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Returns the most recent final reply.
    #[must_use]
    pub const fn last_reply(&self) -> Option<&LastReply> {
        self.session.last_reply()
    }

    /// Parses the cached EHLO capabilities into extensions.
    #[must_use]
    pub fn extensions(&self) -> Vec<Extension> {
        self.session
            .capabilities()
            .map(Extension::from_capabilities)
            .unwrap_or_default()
    }

    /// Returns the advertised maximum message size.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions().into_iter().find_map(|ext| match ext {
            Extension::Size(size) => size,
            _ => None,
        })
    }

    /// Reads the 220 greeting.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the server refuses service (e.g. 554).
    pub fn open(&mut self) -> Result<Reply> {
        self.session.begin(State::Greeting)?;
        let result = self.open_step();
        self.session.settle(result)
    }

    fn open_step(&mut self) -> Result<Reply> {
        let reply = expect(self.read_reply()?, |c| c == ReplyCode::SERVICE_READY)?;
        self.session.set_flags(SessionFlags::CONNECTED, true);
        self.greeting = Some(reply.text());
        Ok(reply)
    }

    /// Sends EHLO, falling back to HELO if the server refuses it.
    ///
    /// A successful EHLO installs every reply line, the server's domain
    /// included, as the capability set and marks the session ESMTP.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if both EHLO and HELO are refused.
    pub fn ehlo(&mut self, domain: &str) -> Result<Reply> {
        let initial = State::Ehlo(EhloPhase::Ehlo(Phase::Send));
        self.session.begin(initial)?;
        if self.session.state() == initial {
            self.domain = Some(domain.to_string());
        }
        let result = self.ehlo_step(State::Ehlo);
        self.session.settle(result)
    }

    fn ehlo_phase(&self) -> EhloPhase {
        match self.session.state() {
            State::Ehlo(p) | State::StartTls(TlsPhase::Ehlo(p)) => p,
            _ => EhloPhase::Ehlo(Phase::Send),
        }
    }

    fn ehlo_step(&mut self, wrap: fn(EhloPhase) -> State) -> Result<Reply> {
        let domain = self.domain.clone().unwrap_or_else(|| "localhost".into());

        if let EhloPhase::Ehlo(phase) = self.ehlo_phase() {
            self.session.invalidate_capabilities();
            let ehlo = Command::Ehlo {
                domain: domain.clone(),
            };
            let reply = self.exchange(phase, |p| wrap(EhloPhase::Ehlo(p)), || ehlo.serialize())?;
            if reply.is_success() {
                self.session
                    .set_capabilities(reply.lines.iter().cloned().collect());
                self.session.set_flags(SessionFlags::ESMTP, true);
                return Ok(reply);
            }
            if !reply.code.is_permanent() {
                return Err(reply.into_error());
            }
            tracing::debug!(code = %reply.code, "EHLO refused, falling back to HELO");
            self.session.advance(wrap(EhloPhase::Helo(Phase::Send)));
        }

        let EhloPhase::Helo(phase) = self.ehlo_phase() else {
            return Err(Error::Usage("EHLO state out of sequence".into()));
        };
        let helo = Command::Helo { domain };
        let reply = self.exchange(phase, |p| wrap(EhloPhase::Helo(p)), || helo.serialize())?;
        let reply = expect(reply, ReplyCode::is_success)?;
        self.session.set_flags(SessionFlags::ESMTP, false);
        self.session.set_capabilities(CapabilitySet::new());
        Ok(reply)
    }

    /// Returns the server capabilities, issuing EHLO unless cached.
    ///
    /// With `force == false` and a cached set no I/O is performed.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] if [`Smtp::ehlo`] was never called, otherwise see
    /// [`Smtp::ehlo`].
    pub fn capabilities(&mut self, force: bool) -> Result<&CapabilitySet> {
        if self.session.is_latched() {
            return Err(Error::Latched);
        }
        let in_flight = matches!(self.session.state(), State::Ehlo(_));
        if force || in_flight || self.session.capabilities().is_none() {
            let domain = self
                .domain
                .clone()
                .ok_or_else(|| Error::Usage("EHLO domain unknown, call ehlo first".into()))?;
            self.ehlo(&domain)?;
        }
        self.session
            .capabilities()
            .ok_or_else(|| Error::Protocol("no capabilities after EHLO".into()))
    }

    /// Upgrades the connection with STARTTLS, then repeats EHLO.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if STARTTLS is not advertised and
    /// [`Error::Usage`] if TLS is already active, both before any I/O. A
    /// failed upgrade or handshake latches the session.
    pub fn starttls(&mut self, server_name: &str) -> Result<()> {
        if !matches!(self.session.state(), State::StartTls(_)) {
            self.check_starttls()?;
        }
        let initial = State::StartTls(TlsPhase::Command(Phase::Send));
        self.session.begin(initial)?;
        if self.session.state() == initial {
            self.server_name = Some(server_name.to_string());
        }
        let result = self.starttls_step();
        self.session.settle(result)
    }

    fn check_starttls(&self) -> Result<()> {
        if self.session.is_latched() {
            return Err(Error::Latched);
        }
        if self.session.flags().contains(SessionFlags::TLS) {
            return Err(Error::Usage("TLS is already active".into()));
        }
        if !self
            .session
            .capabilities()
            .is_some_and(|caps| caps.contains("STARTTLS"))
        {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        Ok(())
    }

    fn starttls_step(&mut self) -> Result<()> {
        if let State::StartTls(TlsPhase::Command(phase)) = self.session.state() {
            let reply = self.exchange(
                phase,
                |p| State::StartTls(TlsPhase::Command(p)),
                || Command::StartTls.serialize(),
            )?;
            expect(reply, |c| c == ReplyCode::SERVICE_READY)?;
            self.session.advance(State::StartTls(TlsPhase::Upgrade));
        }
        if self.session.state() == State::StartTls(TlsPhase::Upgrade) {
            let name = self.server_name.clone().unwrap_or_default();
            self.session.upgrade_tls(Arc::clone(&self.tls), &name)?;
            self.session.set_flags(SessionFlags::ESMTP, false);
            self.session.advance(State::StartTls(TlsPhase::Handshake));
        }
        if self.session.state() == State::StartTls(TlsPhase::Handshake) {
            self.session.drive_handshake()?;
            if self.domain.is_none() {
                return Ok(());
            }
            self.session
                .advance(State::StartTls(TlsPhase::Ehlo(EhloPhase::Ehlo(Phase::Send))));
        }
        self.ehlo_step(|p| State::StartTls(TlsPhase::Ehlo(p)))?;
        Ok(())
    }

    /// Authenticates with SASL PLAIN using an initial response.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if the cached capabilities lack `AUTH PLAIN`,
    /// [`Error::Rejected`] on bad credentials.
    pub fn auth_plain(&mut self, user: &str, password: &str) -> Result<()> {
        let token = BASE64.encode(format!("\0{user}\0{password}"));
        self.authenticate(AuthMechanism::Plain, Some(token), Vec::new())
    }

    /// Authenticates with SASL LOGIN, answering the username and password
    /// challenges.
    ///
    /// # Errors
    ///
    /// See [`Smtp::auth_plain`].
    pub fn auth_login(&mut self, user: &str, password: &str) -> Result<()> {
        let answers = vec![BASE64.encode(user), BASE64.encode(password)];
        self.authenticate(AuthMechanism::Login, None, answers)
    }

    fn authenticate(
        &mut self,
        mechanism: AuthMechanism,
        initial: Option<String>,
        answers: Vec<String>,
    ) -> Result<()> {
        if !matches!(self.session.state(), State::Auth(_)) && !self.session.is_latched() {
            if self.session.flags().contains(SessionFlags::AUTH) {
                return Err(Error::Usage("already authenticated".into()));
            }
            if let Some(caps) = self.session.capabilities()
                && !mechanism.is_advertised(caps)
            {
                return Err(Error::NotSupported(format!("AUTH {}", mechanism.as_str())));
            }
        }
        let initial_state = State::Auth(AuthPhase::Command(Phase::Send));
        self.session.begin(initial_state)?;
        if self.session.state() == initial_state {
            self.sasl = answers;
        }
        let result = self.auth_step(mechanism, initial);
        if !result.as_ref().is_err_and(Error::is_would_block) {
            self.sasl.clear();
        }
        self.session.settle(result)
    }

    fn auth_step(&mut self, mechanism: AuthMechanism, initial: Option<String>) -> Result<()> {
        let (mut reply, mut next) = match self.session.state() {
            State::Auth(AuthPhase::Command(phase)) => {
                let auth = Command::Auth {
                    mechanism,
                    initial_response: initial,
                };
                (self.secure_exchange(phase, State::Auth, AuthPhase::Command, auth.serialize())?, 0)
            }
            State::Auth(AuthPhase::Answer(n, phase)) => (self.answer(n, phase)?, n + 1),
            other => return Err(Error::Usage(format!("{other:?} is not an AUTH state"))),
        };
        loop {
            match reply.code {
                ReplyCode::AUTH_SUCCESS => {
                    self.session.set_flags(SessionFlags::AUTH, true);
                    self.session.invalidate_capabilities();
                    return Ok(());
                }
                ReplyCode::AUTH_CONTINUE if next < self.sasl.len() => {
                    self.session
                        .advance(State::Auth(AuthPhase::Answer(next, Phase::Send)));
                    reply = self.answer(next, Phase::Send)?;
                    next += 1;
                }
                ReplyCode::AUTH_CONTINUE => {
                    return Err(Error::Protocol("unexpected SASL challenge".into()));
                }
                _ => return Err(reply.into_error()),
            }
        }
    }

    fn answer(&mut self, n: usize, phase: Phase) -> Result<Reply> {
        let mut line = self.sasl.get(n).cloned().unwrap_or_default().into_bytes();
        line.extend_from_slice(b"\r\n");
        self.secure_exchange(phase, State::Auth, move |p| AuthPhase::Answer(n, p), line)
    }

    fn secure_exchange(
        &mut self,
        phase: Phase,
        outer: fn(AuthPhase) -> State,
        inner: impl Fn(Phase) -> AuthPhase,
        line: Vec<u8>,
    ) -> Result<Reply> {
        if phase == Phase::Send {
            self.session.set_trace_level(Level::Secure);
        }
        self.exchange(phase, |p| outer(inner(p)), || line)
    }

    /// Starts a transaction with `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on a negative reply.
    pub fn mail_from(&mut self, from: &Address, params: &[&str]) -> Result<Reply> {
        let cmd = Command::MailFrom {
            from: from.clone(),
            params: params.iter().map(ToString::to_string).collect(),
        };
        self.simple(State::MailFrom, &cmd, ReplyCode::is_success)
    }

    /// Adds a recipient with `RCPT TO`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on a negative reply.
    pub fn rcpt_to(&mut self, to: &Address) -> Result<Reply> {
        let cmd = Command::RcptTo {
            to: to.clone(),
            params: Vec::new(),
        };
        self.simple(State::RcptTo, &cmd, ReplyCode::is_success)
    }

    /// Sends the message with `DATA`.
    ///
    /// The payload is dot-stuffed, line endings are normalized to CRLF and
    /// the `.` terminator is appended. In the transcript the payload shows as
    /// `(data...)` unless the trace mask includes payloads.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if DATA is refused or the message is not accepted.
    pub fn data(&mut self, message: &[u8]) -> Result<Reply> {
        self.session
            .begin(State::Data(DataPhase::Command(Phase::Send)))?;
        let result = self.data_step(message);
        self.session.settle(result)
    }

    fn data_step(&mut self, message: &[u8]) -> Result<Reply> {
        if let State::Data(DataPhase::Command(phase)) = self.session.state() {
            let reply = self.exchange(
                phase,
                |p| State::Data(DataPhase::Command(p)),
                || Command::Data.serialize(),
            )?;
            expect(reply, |c| c == ReplyCode::START_DATA)?;
            self.session.advance(State::Data(DataPhase::Payload));
        }
        if self.session.state() == State::Data(DataPhase::Payload) {
            self.session.set_trace_level(Level::Payload);
            self.session.queue(&dot::stuff(message));
            self.session.advance(State::Data(DataPhase::PayloadFlush));
        }
        if self.session.state() == State::Data(DataPhase::PayloadFlush) {
            self.session.flush()?;
            self.session.set_trace_level(Level::Normal);
            self.session.advance(State::Data(DataPhase::Reply));
        }
        expect(self.read_reply()?, ReplyCode::is_success)
    }

    /// Aborts the current transaction.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on a negative reply.
    pub fn rset(&mut self) -> Result<Reply> {
        self.simple(State::Rset, &Command::Rset, ReplyCode::is_success)
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on a negative reply.
    pub fn noop(&mut self) -> Result<Reply> {
        self.simple(State::Noop, &Command::Noop, ReplyCode::is_success)
    }

    /// Sends QUIT and expects 221.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on any other reply.
    pub fn quit(&mut self) -> Result<Reply> {
        let reply = self.simple(State::Quit, &Command::Quit, |c| c == ReplyCode::CLOSING)?;
        self.session.set_flags(SessionFlags::CONNECTED, false);
        Ok(reply)
    }

    fn simple(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        ok: fn(ReplyCode) -> bool,
    ) -> Result<Reply> {
        self.session.begin(wrap(Phase::Send))?;
        let phase = simple_phase(self.session.state());
        let result = self
            .exchange(phase, wrap, || cmd.serialize())
            .and_then(|reply| expect(reply, ok));
        self.session.settle(result)
    }

    /// Runs one command/reply exchange, resuming at `phase`.
    fn exchange(
        &mut self,
        mut phase: Phase,
        wrap: impl Fn(Phase) -> State,
        line: impl FnOnce() -> Vec<u8>,
    ) -> Result<Reply> {
        if phase == Phase::Send {
            self.session.queue(&line());
            phase = Phase::Flush;
            self.session.advance(wrap(phase));
        }
        if phase == Phase::Flush {
            self.session.flush()?;
            self.session.set_trace_level(Level::Normal);
            self.session.advance(wrap(Phase::Reply));
        }
        self.read_reply()
    }

    /// Reads one complete reply, accumulating continuation lines in the
    /// session so that a would-block loses nothing.
    fn read_reply(&mut self) -> Result<Reply> {
        loop {
            let line = self.session.read_line()?;
            let parsed = parser::parse_line(&line)?;
            if let Some(first) = self.session.pending_mut().first() {
                parser::check_code(parser::parse_line(first)?.code, parsed.code)?;
            }
            if parsed.last {
                let mut raw = self.session.take_pending();
                raw.push(line);
                self.session.set_flags(SessionFlags::MULTILINE, false);
                let reply = parser::parse_reply(&raw)?;
                self.session
                    .set_last_reply(reply.code.to_string(), reply.last_line());
                return Ok(reply);
            }
            self.session.set_flags(SessionFlags::MULTILINE, true);
            self.session.pending_mut().push(line);
        }
    }
}

impl<S: Read + Write> Client for Smtp<S> {
    type Stream = S;
    type State = State;

    fn session(&self) -> &Session<S, State> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<S, State> {
        &mut self.session
    }
}
