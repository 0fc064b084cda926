//! NNTP commands.

use std::fmt;

use mailwire_core::{Error, Result};

use crate::types::ArticleId;

/// NNTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITIES
    Capabilities,
    /// STARTTLS (RFC 4642)
    StartTls,
    /// MODE READER
    ModeReader,
    /// AUTHINFO USER name (RFC 4643)
    AuthinfoUser(String),
    /// AUTHINFO PASS secret
    AuthinfoPass(String),
    /// GROUP name
    Group(String),
    /// ARTICLE
    Article(ArticleId),
    /// HEAD
    Head(ArticleId),
    /// BODY
    Body(ArticleId),
    /// STAT
    Stat(ArticleId),
    /// NEXT
    Next,
    /// LAST
    Last,
    /// LIST ACTIVE, optionally restricted by a wildmat
    ListActive(Option<String>),
    /// DATE
    Date,
    /// POST
    Post,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command line, CRLF included.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] if an argument would break the command line: line
    /// breaks anywhere, whitespace in group names, message-ids and wildmats,
    /// or a message-id without angle brackets.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(format!("{self}\r\n").into_bytes())
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::AuthinfoUser(s) | Self::AuthinfoPass(s) => check_text(s),
            Self::Group(name) | Self::ListActive(Some(name)) => check_token(name),
            Self::Article(id) | Self::Head(id) | Self::Body(id) | Self::Stat(id) => {
                if let ArticleId::MessageId(mid) = id {
                    check_token(mid)?;
                    if !(mid.len() > 2 && mid.starts_with('<') && mid.ends_with('>')) {
                        return Err(Error::Usage(format!("malformed message-id {mid:?}")));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns true if the line carries a credential.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::AuthinfoPass(_))
    }
}

fn check_text(s: &str) -> Result<()> {
    if s.is_empty() || s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Usage("argument is empty or contains CR, LF or NUL".into()));
    }
    Ok(())
}

fn check_token(s: &str) -> Result<()> {
    if s.is_empty() || s.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(Error::Usage(format!("invalid argument {s:?}")));
    }
    Ok(())
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => Ok(()),
            Self::Number(n) => write!(f, " {n}"),
            Self::MessageId(id) => write!(f, " {id}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capabilities => f.write_str("CAPABILITIES"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::ModeReader => f.write_str("MODE READER"),
            Self::AuthinfoUser(user) => write!(f, "AUTHINFO USER {user}"),
            Self::AuthinfoPass(pass) => write!(f, "AUTHINFO PASS {pass}"),
            Self::Group(name) => write!(f, "GROUP {name}"),
            Self::Article(id) => write!(f, "ARTICLE{id}"),
            Self::Head(id) => write!(f, "HEAD{id}"),
            Self::Body(id) => write!(f, "BODY{id}"),
            Self::Stat(id) => write!(f, "STAT{id}"),
            Self::Next => f.write_str("NEXT"),
            Self::Last => f.write_str("LAST"),
            Self::ListActive(None) => f.write_str("LIST ACTIVE"),
            Self::ListActive(Some(wildmat)) => write!(f, "LIST ACTIVE {wildmat}"),
            Self::Date => f.write_str("DATE"),
            Self::Post => f.write_str("POST"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize().unwrap()).unwrap()
    }

    #[test]
    fn test_article_addressing() {
        assert_eq!(wire(&Command::Article(ArticleId::Current)), "ARTICLE\r\n");
        assert_eq!(wire(&Command::Head(3_000_234.into())), "HEAD 3000234\r\n");
        assert_eq!(
            wire(&Command::Body("<45223423@example.com>".into())),
            "BODY <45223423@example.com>\r\n"
        );
    }

    #[test]
    fn test_list_active() {
        assert_eq!(wire(&Command::ListActive(None)), "LIST ACTIVE\r\n");
        assert_eq!(
            wire(&Command::ListActive(Some("comp.lang.*".into()))),
            "LIST ACTIVE comp.lang.*\r\n"
        );
    }

    #[test]
    fn test_refuses_injection() {
        for cmd in [
            Command::Group("misc.test\r\nQUIT".into()),
            Command::Group("misc test".into()),
            Command::Group(String::new()),
            Command::AuthinfoPass("secret\nQUIT".into()),
            Command::Stat("no-brackets@example.com".into()),
            Command::Stat("<>".into()),
        ] {
            assert!(matches!(cmd.serialize(), Err(Error::Usage(_))), "{cmd:?}");
        }
    }

    #[test]
    fn test_only_pass_is_secret() {
        assert!(Command::AuthinfoPass("x".into()).is_secret());
        assert!(!Command::AuthinfoUser("x".into()).is_secret());
    }
}
