//! Resumable IMAP client.

use std::io::{Read, Write};
use std::mem;
use std::sync::Arc;

use mailwire_core::net::{self, TcpSocket};
use mailwire_core::{
    CapabilitySet, Carrier, Client, Config, Error, LastReply, Level, Result, Session,
    SessionFlags, default_tls_config,
};
use rustls::ClientConfig;

use super::{Phase, State, TlsPhase};
use crate::command::{Command, FetchItems, StatusAttribute, StoreAction, TagGenerator};
use crate::parser::{self, Response, ResponseParser, Untagged};
use crate::types::{
    ListResponse, Mailbox, MailboxStatus, ResponseCode, SequenceSet, StatusItem,
};

/// Largest literal the client accepts.
const MAX_LITERAL: usize = 100 * 1024 * 1024;

/// Tagged completion of a command together with the untagged data it
/// produced.
#[derive(Debug)]
struct Completion {
    code: Option<ResponseCode>,
    untagged: Vec<Untagged>,
}

/// IMAP4rev1 client over stream `S`.
///
/// Exactly one tagged command is outstanding at a time. Operations return
/// [`Error::WouldBlock`] whenever the transport has to wait; calling the
/// same operation again resumes it without re-sending the command.
#[derive(Debug)]
pub struct Imap<S: Read + Write> {
    session: Session<S, State>,
    tls: Arc<ClientConfig>,
    tags: TagGenerator,
    /// Tag of the outstanding command.
    tag: Option<String>,
    /// Length of the literal still to be read for the current frame.
    literal: Option<usize>,
    untagged: Vec<Untagged>,
    bye: Option<String>,
    selected: Option<Mailbox>,
    server_name: Option<String>,
    greeting: Option<String>,
}

impl Imap<TcpSocket> {
    /// Connects to the configured server. Call [`Imap::open`] next.
    ///
    /// # Errors
    ///
    /// See [`net::connect`].
    pub async fn connect(config: &Config) -> Result<Self> {
        let carrier = net::connect(config).await?;
        Ok(Self::new(carrier).with_tls_config(config.tls_config()))
    }
}

impl<S: Read + Write> Imap<S> {
    /// Creates a client over `carrier`.
    #[must_use]
    pub fn new(carrier: Carrier<S>) -> Self {
        Self {
            session: Session::with_carrier(carrier),
            tls: default_tls_config(),
            tags: TagGenerator::default(),
            tag: None,
            literal: None,
            untagged: Vec::new(),
            bye: None,
            selected: None,
            server_name: None,
            greeting: None,
        }
    }

    /// Uses `config` for STARTTLS.
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = config;
        self
    }

    /// Uses `tags` to generate command tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagGenerator) -> Self {
        self.tags = tags;
        self
    }

    /// Returns the greeting text.
    #[must_use]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Returns the selected mailbox.
    #[must_use]
    pub const fn selected(&self) -> Option<&Mailbox> {
        self.selected.as_ref()
    }

    /// Returns the most recent status response.
    #[must_use]
    pub const fn last_reply(&self) -> Option<&LastReply> {
        self.session.last_reply()
    }

    /// Reads the greeting.
    ///
    /// `PREAUTH` marks the session authenticated. A `[CAPABILITY ...]` code
    /// fills the capability cache.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] for a `BYE` greeting.
    pub fn open(&mut self) -> Result<String> {
        self.session.begin(State::Greeting)?;
        let result = self.open_step();
        self.settle(result)
    }

    fn open_step(&mut self) -> Result<String> {
        let frame = self.read_frame()?;
        let (status, code, text, preauth) = match ResponseParser::parse(&frame)? {
            Response::Untagged(Untagged::Ok { code, text }) => ("OK", code, text, false),
            Response::Untagged(Untagged::PreAuth { code, text }) => ("PREAUTH", code, text, true),
            Response::Untagged(Untagged::Bye { text, .. }) => {
                self.session.set_last_reply("BYE", text.clone());
                return Err(Error::rejected("BYE", text));
            }
            other => return Err(Error::Protocol(format!("unexpected greeting {other:?}"))),
        };
        self.session.set_last_reply(status, text.clone());
        if let Some(ResponseCode::Capability(caps)) = code {
            self.session.set_capabilities(caps);
        }
        self.session.set_flags(SessionFlags::CONNECTED, true);
        self.session.set_flags(SessionFlags::AUTH, preauth);
        self.greeting = Some(text.clone());
        Ok(text)
    }

    /// Returns the server capabilities, issuing CAPABILITY unless cached.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on a `NO` or `BAD` completion.
    pub fn capability(&mut self, force: bool) -> Result<&CapabilitySet> {
        if self.session.is_latched() {
            return Err(Error::Latched);
        }
        let in_flight = matches!(self.session.state(), State::Capability(_));
        if force || in_flight || self.session.capabilities().is_none() {
            self.session.begin(State::Capability(Phase::Send))?;
            if self.session.state() == State::Capability(Phase::Send) {
                self.session.invalidate_capabilities();
            }
            let result = self
                .exchange(State::Capability, &Command::Capability)
                .map(|done| {
                    let caps = capability_data(done.untagged).unwrap_or_default();
                    self.session.set_capabilities(caps);
                });
            self.settle(result)?;
        }
        self.session
            .capabilities()
            .ok_or_else(|| Error::Protocol("no capabilities after CAPABILITY".into()))
    }

    /// Upgrades the connection with STARTTLS.
    ///
    /// The capability cache stays empty afterwards; call
    /// [`Imap::capability`] again.
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
            self.exchange(|p| State::StartTls(TlsPhase::Command(p)), &Command::StartTls)?;
            self.session.advance(State::StartTls(TlsPhase::Upgrade));
        }
        if self.session.state() == State::StartTls(TlsPhase::Upgrade) {
            let name = self.server_name.clone().unwrap_or_default();
            self.session.upgrade_tls(Arc::clone(&self.tls), &name)?;
            self.session.advance(State::StartTls(TlsPhase::Handshake));
        }
        self.session.drive_handshake()
    }

    /// Authenticates with LOGIN. The password is masked in transcripts.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] once authenticated, [`Error::NotSupported`] if the
    /// server advertised `LOGINDISABLED`, [`Error::Rejected`] on failure.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if self.session.is_idle() {
            if self.session.flags().contains(SessionFlags::AUTH) {
                return Err(Error::Usage("already authenticated".into()));
            }
            if self
                .session
                .capabilities()
                .is_some_and(|caps| caps.contains("LOGINDISABLED"))
            {
                return Err(Error::NotSupported("LOGIN".into()));
            }
        }
        self.session.begin(State::Login(Phase::Send))?;
        let cmd = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let result = self.exchange(State::Login, &cmd).map(|done| {
            self.session.set_flags(SessionFlags::AUTH, true);
            self.session.invalidate_capabilities();
            let caps = match done.code {
                Some(ResponseCode::Capability(caps)) => Some(caps),
                _ => capability_data(done.untagged),
            };
            if let Some(caps) = caps {
                self.session.set_capabilities(caps);
            }
        });
        self.settle(result)
    }

    /// Selects `mailbox` read-write.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] before authentication, [`Error::Rejected`] if the
    /// mailbox cannot be selected. A failed SELECT leaves no mailbox
    /// selected.
    pub fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.open_mailbox(State::Select, mailbox, false)
    }

    /// Selects `mailbox` read-only.
    ///
    /// # Errors
    ///
    /// As [`Imap::select`].
    pub fn examine(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.open_mailbox(State::Examine, mailbox, true)
    }

    fn open_mailbox(
        &mut self,
        wrap: fn(Phase) -> State,
        mailbox: &str,
        read_only: bool,
    ) -> Result<MailboxStatus> {
        self.check_authenticated()?;
        self.session.begin(wrap(Phase::Send))?;
        if self.session.state() == wrap(Phase::Send) {
            self.selected = None;
        }
        let name = Mailbox::new(mailbox);
        let cmd = if read_only {
            Command::Examine(name.clone())
        } else {
            Command::Select(name.clone())
        };
        let result = self.exchange(wrap, &cmd).map(|done| {
            self.selected = Some(name);
            mailbox_status(done, read_only)
        });
        self.settle(result)
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] before authentication, [`Error::Rejected`] on
    /// failure.
    pub fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.check_authenticated()?;
        let cmd = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        self.simple(State::List, &cmd, |done| {
            done.untagged
                .into_iter()
                .filter_map(|u| match u {
                    Untagged::List(list) => Some(list),
                    _ => None,
                })
                .collect()
        })
    }

    /// Queries the status of `mailbox` without selecting it.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] before authentication, [`Error::Rejected`] on
    /// failure.
    pub fn status(&mut self, mailbox: &str, items: &[StatusAttribute]) -> Result<Vec<StatusItem>> {
        self.check_authenticated()?;
        let cmd = Command::Status {
            mailbox: Mailbox::new(mailbox),
            items: items.to_vec(),
        };
        self.simple(State::Status, &cmd, |done| {
            done.untagged
                .into_iter()
                .filter_map(|u| match u {
                    Untagged::Status { items, .. } => Some(items),
                    _ => None,
                })
                .flatten()
                .collect()
        })
    }

    /// Changes flags of the messages in `set`.
    ///
    /// Returns the untagged responses, normally one FETCH per message.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] without a selected mailbox, [`Error::Rejected`] on
    /// failure.
    pub fn store(&mut self, set: &SequenceSet, action: StoreAction) -> Result<Vec<Untagged>> {
        self.store_with(set, action, false)
    }

    /// As [`Imap::store`], addressing messages by UID.
    ///
    /// # Errors
    ///
    /// As [`Imap::store`].
    pub fn uid_store(&mut self, set: &SequenceSet, action: StoreAction) -> Result<Vec<Untagged>> {
        self.store_with(set, action, true)
    }

    fn store_with(
        &mut self,
        set: &SequenceSet,
        action: StoreAction,
        uid: bool,
    ) -> Result<Vec<Untagged>> {
        self.check_selected()?;
        let cmd = Command::Store {
            set: set.clone(),
            action,
            silent: false,
            uid,
        };
        self.simple(State::Store, &cmd, |done| done.untagged)
    }

    /// Fetches `items` for the messages in `set`.
    ///
    /// Returns every untagged response received, with literal data intact.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] without a selected mailbox, [`Error::Rejected`] on
    /// failure.
    pub fn fetch(&mut self, set: &SequenceSet, items: FetchItems) -> Result<Vec<Untagged>> {
        self.fetch_with(set, items, false)
    }

    /// As [`Imap::fetch`], addressing messages by UID.
    ///
    /// # Errors
    ///
    /// As [`Imap::fetch`].
    pub fn uid_fetch(&mut self, set: &SequenceSet, items: FetchItems) -> Result<Vec<Untagged>> {
        self.fetch_with(set, items, true)
    }

    fn fetch_with(
        &mut self,
        set: &SequenceSet,
        items: FetchItems,
        uid: bool,
    ) -> Result<Vec<Untagged>> {
        self.check_selected()?;
        let cmd = Command::Fetch {
            set: set.clone(),
            items,
            uid,
        };
        self.simple(State::Fetch, &cmd, |done| done.untagged)
    }

    /// Permanently removes messages flagged `\Deleted`.
    ///
    /// Returns the expunged sequence numbers in server order.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] without a selected mailbox, [`Error::Rejected`] on
    /// failure.
    pub fn expunge(&mut self) -> Result<Vec<u32>> {
        self.check_selected()?;
        self.simple(State::Expunge, &Command::Expunge, |done| {
            done.untagged
                .into_iter()
                .filter_map(|u| match u {
                    Untagged::Expunge(n) => Some(n),
                    _ => None,
                })
                .collect()
        })
    }

    /// Closes the selected mailbox, expunging deleted messages silently.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] without a selected mailbox, [`Error::Rejected`] on
    /// failure.
    pub fn close(&mut self) -> Result<()> {
        self.check_selected()?;
        self.simple(State::Close, &Command::Close, |_| ())?;
        self.selected = None;
        Ok(())
    }

    /// Sends NOOP and returns any untagged updates.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on failure.
    pub fn noop(&mut self) -> Result<Vec<Untagged>> {
        self.simple(State::Noop, &Command::Noop, |done| done.untagged)
    }

    /// Ends the session. Returns the text of the server's BYE.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] on failure.
    pub fn logout(&mut self) -> Result<String> {
        let text = self.simple(State::Logout, &Command::Logout, |done| {
            done.untagged
                .into_iter()
                .find_map(|u| match u {
                    Untagged::Bye { text, .. } => Some(text),
                    _ => None,
                })
                .unwrap_or_default()
        })?;
        self.session.set_flags(SessionFlags::CONNECTED, false);
        self.selected = None;
        Ok(text)
    }

    fn check_authenticated(&self) -> Result<()> {
        if self.session.is_idle() && !self.session.flags().contains(SessionFlags::AUTH) {
            return Err(Error::Usage("not authenticated".into()));
        }
        Ok(())
    }

    fn check_selected(&self) -> Result<()> {
        if self.session.is_idle() && self.selected.is_none() {
            return Err(Error::Usage("no mailbox selected".into()));
        }
        Ok(())
    }

    fn simple<T>(
        &mut self,
        wrap: fn(Phase) -> State,
        cmd: &Command,
        finish: impl FnOnce(Completion) -> T,
    ) -> Result<T> {
        self.session.begin(wrap(Phase::Send))?;
        let result = self.exchange(wrap, cmd).map(finish);
        self.settle(result)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        let result = self.session.settle(result);
        if !matches!(result, Err(Error::WouldBlock)) {
            self.literal = None;
            self.tag = None;
        }
        result
    }

    /// Runs the tagged exchange from the current phase.
    fn exchange(&mut self, wrap: impl Fn(Phase) -> State, cmd: &Command) -> Result<Completion> {
        let mut phase = self.session.state().phase().unwrap_or(Phase::Send);
        if phase == Phase::Send {
            let tag = self.tags.next();
            let line = cmd.serialize(&tag)?;
            self.untagged.clear();
            self.bye = None;
            if cmd.is_secret() {
                self.session.set_trace_level(Level::Secure);
            }
            self.session.queue(&line);
            self.tag = Some(tag);
            phase = Phase::Flush;
            self.session.advance(wrap(phase));
        }
        if phase == Phase::Flush {
            self.session.flush()?;
            self.session.set_trace_level(Level::Normal);
            self.session.advance(wrap(Phase::Response));
        }
        loop {
            let frame = self.read_frame()?;
            match ResponseParser::parse(&frame)? {
                Response::Tagged {
                    tag,
                    status,
                    code,
                    text,
                } => {
                    if self.tag.as_deref() != Some(tag.as_str()) {
                        return Err(Error::Protocol(format!(
                            "tagged reply {tag} does not match the outstanding command"
                        )));
                    }
                    self.tag = None;
                    self.session.set_last_reply(status.as_str(), text.clone());
                    if self.bye.is_some() && *cmd != Command::Logout {
                        return Err(Error::ConnectionClosed);
                    }
                    if !status.is_ok() {
                        return Err(Error::rejected(status.as_str(), text));
                    }
                    return Ok(Completion {
                        code,
                        untagged: mem::take(&mut self.untagged),
                    });
                }
                Response::Untagged(untagged) => {
                    if let Untagged::Bye { text, .. } = &untagged {
                        tracing::debug!(%text, "server sent BYE");
                        self.bye = Some(text.clone());
                    }
                    self.untagged.push(untagged);
                }
                Response::Continuation { .. } => {
                    return Err(Error::Protocol("unexpected continuation request".into()));
                }
            }
        }
    }

    /// Reads one response frame: a line plus any literals it announces,
    /// spliced together exactly as received.
    ///
    /// A literal is read by length; CRLF inside it does not end the frame.
    fn read_frame(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(n) = self.literal {
                let data = self.session.read_exact(n)?;
                self.session.payload_mut().extend_from_slice(&data);
                self.literal = None;
            }
            let line = self.session.read_line_bytes()?;
            let frame = self.session.payload_mut();
            frame.extend_from_slice(&line);
            frame.extend_from_slice(b"\r\n");
            match parser::literal_len(&line) {
                Some(n) if n > MAX_LITERAL => {
                    return Err(Error::Protocol(format!("literal of {n} bytes is too large")));
                }
                Some(n) => {
                    self.literal = Some(n);
                    self.session.set_flags(SessionFlags::MULTILINE, true);
                }
                None => {
                    self.session.set_flags(SessionFlags::MULTILINE, false);
                    return Ok(self.session.take_payload());
                }
            }
        }
    }
}

impl<S: Read + Write> Client for Imap<S> {
    type Stream = S;
    type State = State;

    fn session(&self) -> &Session<S, State> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<S, State> {
        &mut self.session
    }
}

fn capability_data(untagged: Vec<Untagged>) -> Option<CapabilitySet> {
    untagged.into_iter().find_map(|u| match u {
        Untagged::Capability(caps) => Some(caps),
        _ => None,
    })
}

/// Builds the mailbox state from a SELECT or EXAMINE completion.
fn mailbox_status(done: Completion, read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only,
        ..MailboxStatus::default()
    };
    for untagged in done.untagged {
        match untagged {
            Untagged::Exists(n) => status.exists = n,
            Untagged::Recent(n) => status.recent = n,
            Untagged::Flags(flags) => status.flags = flags,
            Untagged::Ok { code: Some(code), .. } => apply_code(&mut status, code),
            _ => {}
        }
    }
    if let Some(code) = done.code {
        apply_code(&mut status, code);
    }
    status
}

fn apply_code(status: &mut MailboxStatus, code: ResponseCode) {
    match code {
        ResponseCode::UidNext(n) => status.uid_next = Some(n),
        ResponseCode::UidValidity(n) => status.uid_validity = Some(n),
        ResponseCode::Unseen(n) => status.unseen = Some(n),
        ResponseCode::HighestModSeq(n) => status.highest_mod_seq = Some(n),
        ResponseCode::PermanentFlags(flags) => status.permanent_flags = flags,
        ResponseCode::ReadOnly => status.read_only = true,
        ResponseCode::ReadWrite => status.read_only = false,
        _ => {}
    }
}
