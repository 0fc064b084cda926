//! SMTP command builder.

use std::fmt;

use crate::types::{Address, AuthMechanism};

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client domain
        domain: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client domain
        domain: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin SASL authentication
    Auth {
        /// Mechanism
        mechanism: AuthMechanism,
        /// Initial response, base64 (RFC 4954 §4)
        initial_response: Option<String>,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Reverse path; may be null
        from: Address,
        /// ESMTP parameters such as `BODY=8BITMIME`
        params: Vec<String>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Forward path
        to: Address,
        /// ESMTP parameters such as `NOTIFY=NEVER`
        params: Vec<String>,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo { domain } => write!(f, "HELO {domain}"),
            Self::Ehlo { domain } => write!(f, "EHLO {domain}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                write!(f, "AUTH {}", mechanism.as_str())?;
                match initial_response {
                    // RFC 4954: an empty initial response is sent as "="
                    Some(resp) if resp.is_empty() => f.write_str(" ="),
                    Some(resp) => write!(f, " {resp}"),
                    None => Ok(()),
                }
            }
            Self::MailFrom { from, params } => {
                write!(f, "MAIL FROM:{from}")?;
                params.iter().try_for_each(|p| write!(f, " {p}"))
            }
            Self::RcptTo { to, params } => {
                write!(f, "RCPT TO:{to}")?;
                params.iter().try_for_each(|p| write!(f, " {p}"))
            }
            Self::Data => f.write_str("DATA"),
            Self::Rset => f.write_str("RSET"),
            Self::Noop => f.write_str("NOOP"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl Command {
    /// Serializes the command line, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.to_string().into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings() {
        let ehlo = Command::Ehlo {
            domain: "client.example.com".into(),
        };
        assert_eq!(ehlo.serialize(), b"EHLO client.example.com\r\n");
        let helo = Command::Helo {
            domain: "client.example.com".into(),
        };
        assert_eq!(helo.to_string(), "HELO client.example.com");
    }

    #[test]
    fn test_auth_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".into()),
        };
        assert_eq!(cmd.to_string(), "AUTH PLAIN AHVzZXIAcGFzcw==");

        let empty = Command::Auth {
            mechanism: AuthMechanism::XOAuth2,
            initial_response: Some(String::new()),
        };
        assert_eq!(empty.to_string(), "AUTH XOAUTH2 =");

        let none = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(none.to_string(), "AUTH LOGIN");
    }

    #[test]
    fn test_envelope_with_params() {
        let mail = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
            params: vec!["BODY=8BITMIME".into(), "SIZE=12345".into()],
        };
        assert_eq!(
            mail.serialize(),
            b"MAIL FROM:<sender@example.com> BODY=8BITMIME SIZE=12345\r\n"
        );

        let bounce = Command::MailFrom {
            from: Address::null(),
            params: vec![],
        };
        assert_eq!(bounce.to_string(), "MAIL FROM:<>");

        let rcpt = Command::RcptTo {
            to: Address::new("rcpt@example.com").unwrap(),
            params: vec![],
        };
        assert_eq!(rcpt.to_string(), "RCPT TO:<rcpt@example.com>");
    }

    #[test]
    fn test_bare_verbs() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }
}
