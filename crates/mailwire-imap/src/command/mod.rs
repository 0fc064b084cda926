//! IMAP commands.

mod serialize;
mod tag_generator;
mod types;

use mailwire_core::Result;

use crate::types::{Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, StatusAttribute, StoreAction};

use serialize::{write_astring, write_fetch_items, write_store_action};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY
    Capability,
    /// NOOP
    Noop,
    /// LOGOUT
    Logout,
    /// STARTTLS
    StartTls,
    /// LOGIN
    Login {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT
    Select(Mailbox),
    /// EXAMINE
    Examine(Mailbox),
    /// LIST
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern, may contain `*` and `%`.
        pattern: String,
    },
    /// STATUS
    Status {
        /// Mailbox to query.
        mailbox: Mailbox,
        /// Items to request.
        items: Vec<StatusAttribute>,
    },
    /// FETCH or UID FETCH
    Fetch {
        /// Messages to fetch.
        set: SequenceSet,
        /// Items to fetch.
        items: FetchItems,
        /// Interpret `set` as UIDs.
        uid: bool,
    },
    /// STORE or UID STORE
    Store {
        /// Messages to change.
        set: SequenceSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH echo.
        silent: bool,
        /// Interpret `set` as UIDs.
        uid: bool,
    },
    /// EXPUNGE
    Expunge,
    /// CLOSE
    Close,
}

impl Command {
    /// Serializes the command with `tag`, including the trailing CRLF.
    ///
    /// # Errors
    ///
    /// [`mailwire_core::Error::Usage`] if a string argument contains CR, LF
    /// or NUL.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }
            Self::Select(mailbox) => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox.as_str())?;
            }
            Self::Examine(mailbox) => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox.as_str())?;
            }
            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference)?;
                buf.push(b' ');
                write_list_pattern(&mut buf, pattern)?;
            }
            Self::Status { mailbox, items } => {
                buf.extend_from_slice(b"STATUS ");
                write_astring(&mut buf, mailbox.as_str())?;
                buf.extend_from_slice(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(item.as_str().as_bytes());
                }
                buf.push(b')');
            }
            Self::Fetch { set, items, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(format!("FETCH {set} ").as_bytes());
                write_fetch_items(&mut buf, items);
            }
            Self::Store {
                set,
                action,
                silent,
                uid,
            } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(format!("STORE {set} ").as_bytes());
                write_store_action(&mut buf, action, *silent);
            }
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),
            Self::Close => buf.extend_from_slice(b"CLOSE"),
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Returns true if the command line carries a credential.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Login { .. })
    }
}

/// List patterns keep their wildcards unquoted when otherwise atom-safe.
fn write_list_pattern(buf: &mut Vec<u8>, pattern: &str) -> Result<()> {
    let plain = !pattern.is_empty()
        && pattern
            .bytes()
            .all(|b| b == b'*' || b == b'%' || (b.is_ascii_graphic() && !b"\"\\(){]".contains(&b)));
    if plain {
        buf.extend_from_slice(pattern.as_bytes());
        Ok(())
    } else {
        write_astring(buf, pattern)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;
    use mailwire_core::Error;

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001").unwrap()).unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(wire(&Command::Capability), "A0001 CAPABILITY\r\n");
        assert_eq!(wire(&Command::Close), "A0001 CLOSE\r\n");
    }

    #[test]
    fn test_login_quotes_when_needed() {
        let cmd = Command::Login {
            username: "alice".into(),
            password: "pa ss\"word".into(),
        };
        assert_eq!(wire(&cmd), "A0001 LOGIN alice \"pa ss\\\"word\"\r\n");
        assert!(cmd.is_secret());
    }

    #[test]
    fn test_crlf_in_argument_is_refused() {
        let cmd = Command::Select(Mailbox::new("INBOX\r\nA0002 DELETE x"));
        assert!(matches!(cmd.serialize("A0001"), Err(Error::Usage(_))));
    }

    #[test]
    fn test_list_keeps_wildcards() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".into(),
        };
        assert_eq!(wire(&cmd), "A0001 LIST \"\" *\r\n");
    }

    #[test]
    fn test_status_items() {
        let cmd = Command::Status {
            mailbox: Mailbox::new("Sent Items"),
            items: vec![StatusAttribute::Messages, StatusAttribute::Unseen],
        };
        assert_eq!(
            wire(&cmd),
            "A0001 STATUS \"Sent Items\" (MESSAGES UNSEEN)\r\n"
        );
    }

    #[test]
    fn test_uid_fetch() {
        let cmd = Command::Fetch {
            set: SequenceSet::Range(1, 4),
            items: FetchItems::Items(vec![
                FetchAttribute::Uid,
                FetchAttribute::Body {
                    section: Some("HEADER".into()),
                    peek: true,
                    partial: None,
                },
            ]),
            uid: true,
        };
        assert_eq!(
            wire(&cmd),
            "A0001 UID FETCH 1:4 (UID BODY.PEEK[HEADER])\r\n"
        );
    }

    #[test]
    fn test_store_silent() {
        let cmd = Command::Store {
            set: SequenceSet::Single(3),
            action: StoreAction::Add(vec![Flag::Deleted, Flag::Seen]),
            silent: true,
            uid: false,
        };
        assert_eq!(
            wire(&cmd),
            "A0001 STORE 3 +FLAGS.SILENT (\\Deleted \\Seen)\r\n"
        );
    }
}
