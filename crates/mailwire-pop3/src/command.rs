//! POP3 commands.

use std::fmt;

use mailwire_core::{Error, Result};

/// POP3 command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPA (RFC 2449)
    Capa,
    /// STLS (RFC 2595)
    Stls,
    /// USER name
    User(String),
    /// PASS secret
    Pass(String),
    /// APOP name digest
    Apop {
        /// Mailbox name
        user: String,
        /// Hex MD5 digest
        digest: String,
    },
    /// STAT
    Stat,
    /// LIST, optionally for one message
    List(Option<u32>),
    /// UIDL, optionally for one message
    Uidl(Option<u32>),
    /// RETR msg
    Retr(u32),
    /// TOP msg lines
    Top(u32, u32),
    /// DELE msg
    Dele(u32),
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command line, CRLF included.
    ///
    /// # Errors
    ///
    /// [`Error::Usage`] if an argument is empty or contains CR, LF or NUL,
    /// or a mailbox name contains a space.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            Self::User(user) | Self::Apop { user, .. } => {
                check_arg(user)?;
                if user.contains(' ') {
                    return Err(Error::Usage(format!("mailbox name {user:?} contains a space")));
                }
            }
            Self::Pass(pass) => check_arg(pass)?,
            _ => {}
        }
        Ok(format!("{self}\r\n").into_bytes())
    }

    /// Returns true if the line carries a credential.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    /// Returns true if a positive reply is followed by a dot-terminated body.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        matches!(
            self,
            Self::Capa | Self::List(None) | Self::Uidl(None) | Self::Retr(_) | Self::Top(..)
        )
    }
}

fn check_arg(s: &str) -> Result<()> {
    if s.is_empty() || s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Usage("argument is empty or contains CR, LF or NUL".into()));
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capa => f.write_str("CAPA"),
            Self::Stls => f.write_str("STLS"),
            Self::User(user) => write!(f, "USER {user}"),
            Self::Pass(pass) => write!(f, "PASS {pass}"),
            Self::Apop { user, digest } => write!(f, "APOP {user} {digest}"),
            Self::Stat => f.write_str("STAT"),
            Self::List(None) => f.write_str("LIST"),
            Self::List(Some(n)) => write!(f, "LIST {n}"),
            Self::Uidl(None) => f.write_str("UIDL"),
            Self::Uidl(Some(n)) => write!(f, "UIDL {n}"),
            Self::Retr(n) => write!(f, "RETR {n}"),
            Self::Top(n, lines) => write!(f, "TOP {n} {lines}"),
            Self::Dele(n) => write!(f, "DELE {n}"),
            Self::Rset => f.write_str("RSET"),
            Self::Noop => f.write_str("NOOP"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        assert_eq!(Command::Top(3, 10).serialize().unwrap(), b"TOP 3 10\r\n");
        assert_eq!(Command::List(None).to_string(), "LIST");
        assert_eq!(Command::Uidl(Some(7)).to_string(), "UIDL 7");
        let apop = Command::Apop {
            user: "mrose".into(),
            digest: "c4c9334bac560ecc979e58001b3e22fb".into(),
        };
        assert_eq!(apop.to_string(), "APOP mrose c4c9334bac560ecc979e58001b3e22fb");
    }

    #[test]
    fn test_multiline_commands() {
        assert!(Command::List(None).is_multiline());
        assert!(!Command::List(Some(1)).is_multiline());
        assert!(Command::Retr(1).is_multiline());
        assert!(!Command::Stat.is_multiline());
        assert!(Command::Pass("x".into()).is_secret());
    }

    #[test]
    fn test_refuses_line_breaks() {
        for cmd in [
            Command::User("alice\r\nDELE 1".into()),
            Command::User("alice smith".into()),
            Command::Pass(String::new()),
            Command::Pass("pw\0".into()),
        ] {
            assert!(matches!(cmd.serialize(), Err(Error::Usage(_))), "{cmd:?}");
        }
        // Passwords may contain spaces.
        assert!(Command::Pass("correct horse".into()).serialize().is_ok());
    }
}
