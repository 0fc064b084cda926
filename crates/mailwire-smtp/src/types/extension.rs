//! SMTP service extensions advertised in the EHLO reply.

use mailwire_core::CapabilitySet;

/// SMTP service extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// DSN - Delivery status notifications
    Dsn,
    /// ENHANCEDSTATUSCODES - RFC 3463 status codes
    EnhancedStatusCodes,
    /// Anything else, verbatim
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            "DSN" => Self::Dsn,
            "ENHANCEDSTATUSCODES" => Self::EnhancedStatusCodes,
            _ => Self::Unknown(line.to_string()),
        }
    }

    /// Parses every extension line of an EHLO capability set.
    ///
    /// The first entry is the server's greeting domain and is skipped.
    #[must_use]
    pub fn from_capabilities(caps: &CapabilitySet) -> Vec<Self> {
        caps.iter().skip(1).map(Self::parse).collect()
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616)
    Plain,
    /// LOGIN (legacy)
    Login,
    /// CRAM-MD5
    CramMd5,
    /// `XOAUTH2`
    XOAuth2,
}

impl AuthMechanism {
    /// Parses a mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }

    /// Returns true if `caps` advertises this mechanism.
    #[must_use]
    pub fn is_advertised(self, caps: &CapabilitySet) -> bool {
        caps.value("AUTH").is_some_and(|mechs| {
            mechs
                .split_whitespace()
                .any(|m| m.eq_ignore_ascii_case(self.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords_case_insensitively() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
        assert_eq!(Extension::parse("8BITMIME"), Extension::EightBitMime);
        assert_eq!(Extension::parse("SIZE 52428800"), Extension::Size(Some(52_428_800)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(
            Extension::parse("X-CUSTOM foo"),
            Extension::Unknown("X-CUSTOM foo".into())
        );
    }

    #[test]
    fn parse_auth_skips_unknown_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH PLAIN GSSAPI LOGIN"),
            Extension::Auth(vec![AuthMechanism::Plain, AuthMechanism::Login])
        );
    }

    #[test]
    fn from_capabilities_skips_domain() {
        let caps: CapabilitySet = ["mail.example.com", "PIPELINING", "AUTH LOGIN"]
            .into_iter()
            .collect();
        assert_eq!(
            Extension::from_capabilities(&caps),
            vec![
                Extension::Pipelining,
                Extension::Auth(vec![AuthMechanism::Login])
            ]
        );
        assert!(AuthMechanism::Login.is_advertised(&caps));
        assert!(!AuthMechanism::Plain.is_advertised(&caps));
    }
}
