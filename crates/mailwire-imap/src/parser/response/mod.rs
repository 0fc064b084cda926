//! Response parser.

mod fetch;
mod helpers;
mod types;

pub use types::{Address, Envelope, FetchItem, Untagged};

use mailwire_core::Result;

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, Status};

use helpers::{
    parse_capability_data, parse_flag_list, parse_list_response, parse_response_code,
    parse_search_response, parse_status_response,
};

/// A parsed response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// Tag of the completed command.
        tag: String,
        /// OK, NO or BAD.
        status: Status,
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(Untagged),
    /// Continuation request.
    Continuation {
        /// Text after `+`.
        text: String,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response frame, literals included.
    ///
    /// # Errors
    ///
    /// [`mailwire_core::Error::Protocol`] if the frame is malformed.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);
        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer, input),
            Token::Plus => {
                if lexer.peek() == Some(b' ') {
                    lexer.advance();
                }
                Ok(Response::Continuation {
                    text: lexer.read_text(),
                })
            }
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag.to_string()),
            Token::Number(tag) => Self::parse_tagged(&mut lexer, tag.to_string()),
            token => Err(lexer.error(&format!("expected *, + or tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: String) -> Result<Response> {
        lexer.expect_space()?;
        let word = lexer.read_atom_string()?;
        let status = match Status::parse(word) {
            Some(s @ (Status::Ok | Status::No | Status::Bad)) => s,
            _ => return Err(lexer.error(&format!("invalid tagged status {word}"))),
        };
        let (code, text) = Self::parse_resp_text(lexer)?;
        Ok(Response::Tagged {
            tag,
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>, input: &[u8]) -> Result<Response> {
        lexer.expect_space()?;
        let untagged = match lexer.next_token()? {
            Token::Atom(word) => match word.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Untagged::Ok { code, text }
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Untagged::No { code, text }
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Untagged::Bad { code, text }
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Untagged::PreAuth { code, text }
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    Untagged::Bye { code, text }
                }
                "CAPABILITY" => Untagged::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    Untagged::Flags(parse_flag_list(lexer)?)
                }
                "LIST" | "LSUB" => {
                    lexer.expect_space()?;
                    Untagged::List(parse_list_response(lexer)?)
                }
                "SEARCH" => Untagged::Search(parse_search_response(lexer)?),
                "STATUS" => {
                    lexer.expect_space()?;
                    let (mailbox, items) = parse_status_response(lexer)?;
                    Untagged::Status { mailbox, items }
                }
                _ => Untagged::Other(input.to_vec()),
            },
            Token::Number(n) => {
                let n = u32::try_from(n).map_err(|_| lexer.error("message number exceeds 32 bits"))?;
                lexer.expect_space()?;
                let word = lexer.read_atom_string()?;
                match word.to_ascii_uppercase().as_str() {
                    "EXISTS" => Untagged::Exists(n),
                    "RECENT" => Untagged::Recent(n),
                    "EXPUNGE" => Untagged::Expunge(n),
                    "FETCH" => {
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        Untagged::Fetch { seq: n, items }
                    }
                    _ => Untagged::Other(input.to_vec()),
                }
            }
            token => return Err(lexer.error(&format!("unexpected {token:?} after *"))),
        };
        Ok(Response::Untagged(untagged))
    }

    /// Parses `[code] text`; both parts are optional.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, lexer.read_text()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Flag, MailboxAttribute, StatusItem};

    fn untagged(input: &[u8]) -> Untagged {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn test_tagged_ok() {
        assert_eq!(
            ResponseParser::parse(b"A0001 OK LOGIN completed\r\n").unwrap(),
            Response::Tagged {
                tag: "A0001".into(),
                status: Status::Ok,
                code: None,
                text: "LOGIN completed".into(),
            }
        );
    }

    #[test]
    fn test_tagged_with_code_and_no_text() {
        let Response::Tagged { status, code, text, .. } =
            ResponseParser::parse(b"A0002 NO [TRYCREATE]\r\n").unwrap()
        else {
            panic!("expected tagged");
        };
        assert_eq!(status, Status::No);
        assert_eq!(code, Some(ResponseCode::TryCreate));
        assert_eq!(text, "");
    }

    #[test]
    fn test_tagged_preauth_is_invalid() {
        assert!(ResponseParser::parse(b"A0001 PREAUTH hi\r\n").is_err());
    }

    #[test]
    fn test_greeting_with_capability_code() {
        let Untagged::Ok { code, text } =
            untagged(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n")
        else {
            panic!("expected OK");
        };
        let Some(ResponseCode::Capability(caps)) = code else {
            panic!("expected capability code");
        };
        assert!(caps.contains("starttls"));
        assert!(caps.contains("LOGINDISABLED"));
        assert_eq!(text, "ready");
    }

    #[test]
    fn test_capability_data() {
        let Untagged::Capability(caps) = untagged(b"* CAPABILITY IMAP4rev1 AUTH=PLAIN IDLE\r\n")
        else {
            panic!("expected CAPABILITY");
        };
        assert_eq!(caps.len(), 3);
        assert_eq!(caps.value("AUTH"), Some("PLAIN"));
    }

    #[test]
    fn test_permanent_flags() {
        let Untagged::Ok {
            code: Some(ResponseCode::PermanentFlags(flags)),
            ..
        } = untagged(b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n")
        else {
            panic!("expected PERMANENTFLAGS");
        };
        assert_eq!(flags.len(), 3);
        assert!(flags.contains(&Flag::MayCreate));
    }

    #[test]
    fn test_message_data() {
        assert_eq!(untagged(b"* 23 EXISTS\r\n"), Untagged::Exists(23));
        assert_eq!(untagged(b"* 5 RECENT\r\n"), Untagged::Recent(5));
        assert_eq!(untagged(b"* 44 EXPUNGE\r\n"), Untagged::Expunge(44));
    }

    #[test]
    fn test_list() {
        let Untagged::List(list) = untagged(b"* LIST (\\HasNoChildren \\Sent) \"/\" \"Sent Items\"\r\n")
        else {
            panic!("expected LIST");
        };
        assert_eq!(list.delimiter, Some('/'));
        assert_eq!(list.mailbox.as_str(), "Sent Items");
        assert!(list.attributes.contains(&MailboxAttribute::Sent));
    }

    #[test]
    fn test_list_name_as_literal() {
        let Untagged::List(list) = untagged(b"* LIST () NIL {4}\r\na)b \r\n") else {
            panic!("expected LIST");
        };
        assert_eq!(list.delimiter, None);
        assert_eq!(list.mailbox.as_str(), "a)b ");
    }

    #[test]
    fn test_status() {
        assert_eq!(
            untagged(b"* STATUS INBOX (MESSAGES 17 UNSEEN 3)\r\n"),
            Untagged::Status {
                mailbox: crate::types::Mailbox::inbox(),
                items: vec![StatusItem::Messages(17), StatusItem::Unseen(3)],
            }
        );
    }

    #[test]
    fn test_search() {
        assert_eq!(
            untagged(b"* SEARCH 2 84 882\r\n"),
            Untagged::Search(vec![2, 84, 882])
        );
        assert_eq!(untagged(b"* SEARCH\r\n"), Untagged::Search(Vec::new()));
    }

    #[test]
    fn test_fetch_with_literal() {
        let Untagged::Fetch { seq, items } =
            untagged(b"* 12 FETCH (UID 7 BODY[] {9}\r\nhi\r\nthere)\r\n")
        else {
            panic!("expected FETCH");
        };
        assert_eq!(seq, 12);
        assert_eq!(items[0], FetchItem::Uid(7));
        assert!(matches!(&items[1], FetchItem::Body { data: Some(d), .. } if d == b"hi\r\nthere"));
    }

    #[test]
    fn test_unknown_untagged_is_kept() {
        let frame = b"* ENABLED CONDSTORE\r\n";
        assert_eq!(untagged(frame), Untagged::Other(frame.to_vec()));
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: "Ready for literal".into()
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_garbage_is_protocol_error() {
        assert!(ResponseParser::parse(b"(oops)\r\n").is_err());
    }
}
