//! Connection configuration types.

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::carrier::default_tls_config;
use crate::transcript::TraceMask;

/// Mail protocol spoken over the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// SMTP submission/relay.
    Smtp,
    /// POP3.
    Pop3,
    /// IMAP4.
    Imap,
    /// NNTP.
    Nntp,
}

impl Protocol {
    /// Returns the well-known port for this protocol and security mode.
    #[must_use]
    pub const fn default_port(self, security: Security) -> u16 {
        let implicit = matches!(security, Security::Implicit);
        match (self, implicit) {
            (Self::Smtp, false) => 25,
            (Self::Smtp, true) => 465,
            (Self::Pop3, false) => 110,
            (Self::Pop3, true) => 995,
            (Self::Imap, false) => 143,
            (Self::Imap, true) => 993,
            (Self::Nntp, false) => 119,
            (Self::Nntp, true) => 563,
        }
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption. **Not recommended for production.**
    None,
    /// Start with plaintext, upgrade with STARTTLS.
    StartTls,
    /// TLS from the start. **Recommended.**
    #[default]
    Implicit,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Protocol, used for default ports.
    pub protocol: Protocol,
    /// Server hostname, also used as the TLS server name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum wait for socket readiness between re-invocations.
    pub io_timeout: Option<Duration>,
    /// Transcript mask; `None` disables the transcript.
    pub trace: Option<TraceMask>,
    /// TLS client configuration; `None` uses the webpki roots.
    pub tls: Option<Arc<ClientConfig>>,
}

impl Config {
    /// Creates a new configuration with implicit TLS on the protocol's port.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>) -> Self {
        ConfigBuilder::new(protocol, host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(protocol: Protocol, host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(protocol, host)
    }

    /// Returns the TLS client configuration to use.
    #[must_use]
    pub fn tls_config(&self) -> Arc<ClientConfig> {
        self.tls.clone().unwrap_or_else(default_tls_config)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    protocol: Protocol,
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    io_timeout: Option<Duration>,
    trace: Option<TraceMask>,
    tls: Option<Arc<ClientConfig>>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given protocol and hostname.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>) -> Self {
        Self {
            protocol,
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Some(Duration::from_secs(60)),
            trace: None,
            tls: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout; `None` waits forever.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Enables the transcript with the given mask.
    #[must_use]
    pub const fn trace(mut self, mask: TraceMask) -> Self {
        self.trace = Some(mask);
        self
    }

    /// Uses a custom TLS client configuration.
    #[must_use]
    pub fn tls(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            protocol: self.protocol,
            port: self
                .port
                .unwrap_or_else(|| self.protocol.default_port(self.security)),
            host: self.host,
            security: self.security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            trace: self.trace,
            tls: self.tls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Protocol::Smtp.default_port(Security::StartTls), 25);
        assert_eq!(Protocol::Smtp.default_port(Security::Implicit), 465);
        assert_eq!(Protocol::Pop3.default_port(Security::None), 110);
        assert_eq!(Protocol::Pop3.default_port(Security::Implicit), 995);
        assert_eq!(Protocol::Imap.default_port(Security::StartTls), 143);
        assert_eq!(Protocol::Imap.default_port(Security::Implicit), 993);
        assert_eq!(Protocol::Nntp.default_port(Security::None), 119);
        assert_eq!(Protocol::Nntp.default_port(Security::Implicit), 563);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new(Protocol::Imap, "imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert!(config.trace.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder(Protocol::Smtp, "smtp.example.com")
            .security(Security::StartTls)
            .connect_timeout(Duration::from_secs(10))
            .io_timeout(None)
            .trace(TraceMask::default())
            .build();

        assert_eq!(config.port, 25);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout, None);
        assert_eq!(config.trace, Some(TraceMask::default()));
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = Config::builder(Protocol::Nntp, "news.example.com")
            .port(1119)
            .build();
        assert_eq!(config.port, 1119);
    }
}
