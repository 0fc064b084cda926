//! Resumable NNTP client.

use std::io::{Read, Write};
use std::sync::Arc;

use mailwire_core::net::{self, TcpSocket};
use mailwire_core::{
    CapabilitySet, Carrier, Client, Config, Error, LastReply, Level, Result, Session,
    SessionFlags, default_tls_config, dot,
};
use rustls::ClientConfig;

use super::{AuthPhase, Phase, PostPhase, State, TlsPhase};
use crate::command::Command;
use crate::parser::{self, StatusLine};
use crate::types::{ActiveGroup, Article, ArticleId, ArticlePointer, GroupInfo, ServerDate};

/// NNTP client over stream `S`.
///
/// Operations return [`Error::WouldBlock`] whenever the transport has to
/// wait. Call the same operation again to resume; the command is never sent
/// twice.
#[derive(Debug)]
pub struct Nntp<S: Read + Write> {
    session: Session<S, State>,
    tls: Arc<ClientConfig>,
    server_name: Option<String>,
    greeting: Option<String>,
    posting: bool,
    group: Option<GroupInfo>,
    /// Status line of the multi-line response being read.
    status: Option<StatusLine>,
}

impl Nntp<TcpSocket> {
    /// Connects to the configured server. Call [`Nntp::open`] next.
    ///
    /// # Errors
    ///
    /// See [`net::connect`].
    pub async fn connect(config: &Config) -> Result<Self> {
        let carrier = net::connect(config).await?;
        Ok(Self::new(carrier).with_tls_config(config.tls_config()))
    }
}

impl<S: Read + Write> Nntp<S> {
    /// Creates a client over `carrier`.
    #[must_use]
    pub fn new(carrier: Carrier<S>) -> Self {
        Self {
            session: Session::with_carrier(carrier),
            tls: default_tls_config(),
            server_name: None,
            greeting: None,
            posting: false,
            group: None,
            status: None,
        }
    }

    /// Uses `config` for STARTTLS.
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

    /// Returns true if the server said posting is permitted (200 rather
    /// than 201).
    #[must_use]
    pub const fn posting_allowed(&self) -> bool {
        self.posting
    }

    /// Returns the group selected by the last successful [`Nntp::group`].
    #[must_use]
    pub const fn group_info(&self) -> Option<&GroupInfo> {
        self.group.as_ref()
    }

    /// Returns the most recent status line.
    #[must_use]
    pub const fn last_reply(&self) -> Option<&LastReply> {
        self.session.last_reply()
    }

    /// Reads the greeting: 200 when posting is allowed, 201 otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 400 or 502.
    pub fn open(&mut self) -> Result<String> {
        self.session.begin(State::Greeting)?;
        let result = self.open_step();
        self.settle(result)
    }

    fn open_step(&mut self) -> Result<String> {
        let status = self.read_status(&[200, 201])?;
        self.posting = status.code == 200;
        tracing::debug!(posting = self.posting, "NNTP greeting");
        self.greeting = Some(status.text.clone());
        self.session.set_flags(SessionFlags::CONNECTED, true);
        Ok(status.text)
    }

    /// Returns the server capabilities, querying them unless cached.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the server does not implement CAPABILITIES.
    pub fn capabilities(&mut self, force: bool) -> Result<&CapabilitySet> {
        if self.session.is_latched() {
            return Err(Error::Latched);
        }
        let in_flight = matches!(self.session.state(), State::Capabilities(_));
        if force || in_flight || self.session.capabilities().is_none() {
            self.session.begin(State::Capabilities(Phase::Send))?;
            if self.session.state() == State::Capabilities(Phase::Send) {
                self.session.invalidate_capabilities();
            }
            let result = self
                .lines_step(State::Capabilities, &Command::Capabilities, 101, |line| {
                    Ok(line.to_string())
                })
                .map(|lines| self.session.set_capabilities(lines.into_iter().collect()));
            self.settle(result)?;
        }
        self.session
            .capabilities()
            .ok_or_else(|| Error::Protocol("no capabilities after CAPABILITIES".into()))
    }

    /// Upgrades the connection with STARTTLS.
    ///
    /// The capability cache stays empty afterwards; call
    /// [`Nntp::capabilities`] again.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] unless `STARTTLS` is advertised,
    /// [`Error::Usage`] if TLS is already active. A failed upgrade or
    /// handshake latches.
    pub fn starttls(&mut self, server_name: &str) -> Result<()> {
        if self.session.is_idle() {
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
        }
        let initial = State::StartTls(TlsPhase::Command(Phase::Send));
        self.session.begin(initial)?;
        if self.session.state() == initial {
            self.server_name = Some(server_name.to_string());
        }
        let result = self.starttls_step();
        self.settle(result)
    }

    fn starttls_step(&mut self) -> Result<()> {
        if let State::StartTls(TlsPhase::Command(_)) = self.session.state() {
            self.exchange(
                |p| State::StartTls(TlsPhase::Command(p)),
                &Command::StartTls,
                &[382],
            )?;
            self.session.advance(State::StartTls(TlsPhase::Upgrade));
        }
        if self.session.state() == State::StartTls(TlsPhase::Upgrade) {
            let name = self.server_name.clone().unwrap_or_default();
            self.session.upgrade_tls(Arc::clone(&self.tls), &name)?;
            self.session.advance(State::StartTls(TlsPhase::Handshake));
        }
        self.session.drive_handshake()
    }

    /// Switches a mode-switching server to reader mode.
    ///
    /// Returns whether posting is allowed afterwards. The capability cache
    /// is invalidated.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 502.
    pub fn mode_reader(&mut self) -> Result<bool> {
        let posting = self.single(State::ModeReader, &Command::ModeReader, &[200, 201], |s| {
            Ok(s.code == 200)
        })?;
        self.posting = posting;
        self.session.invalidate_capabilities();
        Ok(posting)
    }

    /// Authenticates with AUTHINFO USER and, if the server asks for it,
    /// AUTHINFO PASS. The password is masked in transcripts.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] once authenticated, [`Error::Rejected`] on 481, 482
    /// or 502.
    pub fn authinfo(&mut self, user: &str, password: &str) -> Result<()> {
        if self.session.is_idle() && self.session.flags().contains(SessionFlags::AUTH) {
            return Err(Error::Usage("already authenticated".into()));
        }
        self.session
            .begin(State::Authinfo(AuthPhase::User(Phase::Send)))?;
        let result = self.authinfo_step(user, password).map(|()| {
            self.session.set_flags(SessionFlags::AUTH, true);
            self.session.invalidate_capabilities();
        });
        self.settle(result)
    }

    fn authinfo_step(&mut self, user: &str, password: &str) -> Result<()> {
        if let State::Authinfo(AuthPhase::User(_)) = self.session.state() {
            let status = self.exchange(
                |p| State::Authinfo(AuthPhase::User(p)),
                &Command::AuthinfoUser(user.to_string()),
                &[281, 381],
            )?;
            if status.code == 281 {
                return Ok(());
            }
            self.session
                .advance(State::Authinfo(AuthPhase::Pass(Phase::Send)));
        }
        self.exchange(
            |p| State::Authinfo(AuthPhase::Pass(p)),
            &Command::AuthinfoPass(password.to_string()),
            &[281],
        )?;
        Ok(())
    }

    /// Selects newsgroup `name`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 411 (no such group); the previously selected
    /// group stays selected.
    pub fn group(&mut self, name: &str) -> Result<GroupInfo> {
        let info = self.single(State::Group, &Command::Group(name.to_string()), &[211], |s| {
            parser::parse_group(&s.text)
        })?;
        self.group = Some(info.clone());
        Ok(info)
    }

    /// Retrieves a whole article.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 412, 420, 423 or 430.
    pub fn article(&mut self, id: impl Into<ArticleId>) -> Result<Article> {
        self.retrieve(State::Article, &Command::Article(id.into()), 220)
    }

    /// Retrieves the headers of an article.
    ///
    /// # Errors
    ///
    /// As [`Nntp::article`].
    pub fn head(&mut self, id: impl Into<ArticleId>) -> Result<Article> {
        self.retrieve(State::Head, &Command::Head(id.into()), 221)
    }

    /// Retrieves the body of an article.
    ///
    /// # Errors
    ///
    /// As [`Nntp::article`].
    pub fn body(&mut self, id: impl Into<ArticleId>) -> Result<Article> {
        self.retrieve(State::Body, &Command::Body(id.into()), 222)
    }

    /// Checks that an article exists and, when addressed by number, makes
    /// it the current article.
    ///
    /// # Errors
    ///
    /// As [`Nntp::article`].
    pub fn stat(&mut self, id: impl Into<ArticleId>) -> Result<ArticlePointer> {
        self.single(State::Stat, &Command::Stat(id.into()), &[223], |s| {
            parser::parse_pointer(&s.text)
        })
    }

    /// Moves to the next article in the group.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 412, 420 or 421.
    pub fn next(&mut self) -> Result<ArticlePointer> {
        self.single(State::Next, &Command::Next, &[223], |s| {
            parser::parse_pointer(&s.text)
        })
    }

    /// Moves to the previous article in the group.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for 412, 420 or 422.
    pub fn last(&mut self) -> Result<ArticlePointer> {
        self.single(State::Last, &Command::Last, &[223], |s| {
            parser::parse_pointer(&s.text)
        })
    }

    /// Lists active groups, optionally only those matching `wildmat`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on 503.
    pub fn list_active(&mut self, wildmat: Option<&str>) -> Result<Vec<ActiveGroup>> {
        let cmd = Command::ListActive(wildmat.map(ToString::to_string));
        self.session.begin(State::ListActive(Phase::Send))?;
        let result = self.lines_step(State::ListActive, &cmd, 215, parser::parse_active);
        self.settle(result)
    }

    /// Returns the server's UTC time.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if DATE is not implemented.
    pub fn date(&mut self) -> Result<ServerDate> {
        self.single(State::Date, &Command::Date, &[111], |s| {
            parser::parse_date(&s.text)
        })
    }

    /// Posts `article`, which must carry its own headers.
    ///
    /// The article is dot-stuffed and terminated here. Returns the text of
    /// the 240 reply.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if the greeting or MODE READER said posting
    /// is not permitted, [`Error::Rejected`] for 440 or 441.
    pub fn post(&mut self, article: &[u8]) -> Result<String> {
        if self.session.is_idle() && !self.posting {
            return Err(Error::NotSupported("POST".into()));
        }
        self.session
            .begin(State::Post(PostPhase::Command(Phase::Send)))?;
        let result = self.post_step(article);
        self.settle(result)
    }

    fn post_step(&mut self, article: &[u8]) -> Result<String> {
        if let State::Post(PostPhase::Command(_)) = self.session.state() {
            self.exchange(
                |p| State::Post(PostPhase::Command(p)),
                &Command::Post,
                &[340],
            )?;
            self.session.advance(State::Post(PostPhase::Payload));
        }
        if self.session.state() == State::Post(PostPhase::Payload) {
            self.session.set_trace_level(Level::Payload);
            self.session.queue(&dot::stuff(article));
            self.session.advance(State::Post(PostPhase::PayloadFlush));
        }
        if self.session.state() == State::Post(PostPhase::PayloadFlush) {
            self.session.flush()?;
            self.session.set_trace_level(Level::Normal);
            self.session.advance(State::Post(PostPhase::Status));
        }
        Ok(self.read_status(&[240])?.text)
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] if the server answers anything but 205.
    pub fn quit(&mut self) -> Result<String> {
        let text = self.single(State::Quit, &Command::Quit, &[205], |s| Ok(s.text))?;
        self.session.set_flags(SessionFlags::CONNECTED, false);
        self.group = None;
        Ok(text)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        let result = self.session.settle(result);
        if !matches!(result, Err(Error::WouldBlock)) {
            self.status = None;
        }
        result
    }

    fn single<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        expected: &[u16],
        parse: impl FnOnce(StatusLine) -> Result<T>,
    ) -> Result<T> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.exchange(wrap, cmd, expected).and_then(parse);
        self.settle(result)
    }

    fn lines_step<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        expected: u16,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.exchange(wrap, cmd, &[expected])?;
        self.session
            .read_dot_lines()?
            .iter()
            .map(|line| parse(line))
            .collect()
    }

    fn retrieve(&mut self, wrap: fn(Phase) -> State, cmd: &Command, expected: u16) -> Result<Article> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.exchange(wrap, cmd, &[expected]).and_then(|status| {
            let pointer = parser::parse_pointer(&status.text)?;
            self.session.set_trace_level(Level::Payload);
            let content = self.session.read_dot_body()?;
            Ok(Article { pointer, content })
        });
        self.settle(result)
    }

    /// Runs the command/status exchange from the current phase.
    ///
    /// Multi-line replies end in [`Phase::Body`] with their status line
    /// kept, so a resumed call sees the same status.
    fn exchange(
        &mut self,
        wrap: impl Fn(Phase) -> State,
        cmd: &Command,
        expected: &[u16],
    ) -> Result<StatusLine> {
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
            return self
                .status
                .clone()
                .ok_or_else(|| Error::Protocol("multi-line status lost".into()));
        }
        let status = self.read_status(expected)?;
        if status.is_multiline() {
            self.status = Some(status.clone());
            self.session.advance(wrap(Phase::Body));
        }
        Ok(status)
    }

    /// Reads a status line and checks it against `expected`.
    ///
    /// An unexpected multi-line code latches: its body would otherwise be
    /// taken for the next reply.
    fn read_status(&mut self, expected: &[u16]) -> Result<StatusLine> {
        let line = self.session.read_line()?;
        let status = parser::parse_status(&line)?;
        self.session
            .set_last_reply(status.code.to_string(), status.text.clone());
        if expected.contains(&status.code) {
            Ok(status)
        } else if status.is_multiline() {
            Err(Error::Protocol(format!("unexpected multi-line reply {line:?}")))
        } else {
            Err(status.into_error())
        }
    }
}

impl<S: Read + Write> Client for Nntp<S> {
    type Stream = S;
    type State = State;

    fn session(&self) -> &Session<S, State> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<S, State> {
        &mut self.session
    }
}
