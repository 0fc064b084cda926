//! FETCH response parsing.

use mailwire_core::Result;

use crate::parser::lexer::{Lexer, Token};

use super::helpers::parse_flag_list;
use super::types::{Address, Envelope, FetchItem};

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("unexpected {token:?} in FETCH data"))),
        };

        let item = match name.to_ascii_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                FetchItem::Flags(parse_flag_list(lexer)?)
            }
            "UID" => {
                lexer.expect_space()?;
                FetchItem::Uid(lexer.read_number()?)
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                FetchItem::Rfc822Size(lexer.read_number()?)
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                FetchItem::InternalDate(lexer.read_nstring()?.unwrap_or_default())
            }
            "ENVELOPE" => {
                lexer.expect_space()?;
                FetchItem::Envelope(Box::new(parse_envelope(lexer)?))
            }
            "MODSEQ" => {
                lexer.expect_space()?;
                lexer.expect(Token::LParen)?;
                let n = lexer.read_number64()?;
                lexer.expect(Token::RParen)?;
                FetchItem::ModSeq(n)
            }
            "BODY" if lexer.peek() == Some(b'[') => parse_body(lexer)?,
            "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" | "BINARY" => parse_body(lexer)?,
            _ => {
                let section = parse_section(lexer)?;
                lexer.expect_space()?;
                let raw = lexer.skip_value()?.to_vec();
                let name = match section {
                    Some(s) => format!("{name}[{s}]"),
                    None => name.to_string(),
                };
                FetchItem::Other { name, raw }
            }
        };
        items.push(item);
    }

    Ok(items)
}

fn parse_body(lexer: &mut Lexer<'_>) -> Result<FetchItem> {
    let section = parse_section(lexer)?;
    let origin = parse_origin(lexer)?;
    lexer.expect_space()?;
    let data = match lexer.next_token()? {
        Token::Literal(d) => Some(d.to_vec()),
        Token::QuotedString(s) => Some(s.into_bytes()),
        Token::Nil => None,
        token => return Err(lexer.error(&format!("expected body data, got {token:?}"))),
    };
    Ok(FetchItem::Body {
        section,
        origin,
        data,
    })
}

/// Reads an optional `[section]`; the content is kept verbatim.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    if lexer.peek() != Some(b'[') {
        return Ok(None);
    }
    lexer.advance();
    let mut section = Vec::new();
    loop {
        match lexer.advance() {
            Some(b']') => break,
            Some(b'\r') | None => return Err(lexer.error("unterminated section")),
            Some(b) => section.push(b),
        }
    }
    Ok(Some(String::from_utf8_lossy(&section).into_owned()))
}

/// Reads an optional `<origin>`.
fn parse_origin(lexer: &mut Lexer<'_>) -> Result<Option<u32>> {
    if lexer.peek() != Some(b'<') {
        return Ok(None);
    }
    lexer.advance();
    let mut n: u32 = 0;
    loop {
        match lexer.advance() {
            Some(b'>') => return Ok(Some(n)),
            Some(d @ b'0'..=b'9') => {
                n = n
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u32::from(d - b'0')))
                    .ok_or_else(|| lexer.error("origin out of range"))?;
            }
            _ => return Err(lexer.error("malformed origin")),
        }
    }
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;
    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => return Err(lexer.error("malformed address list")),
                }
            }
            Ok(addresses)
        }
        token => Err(lexer.error(&format!("expected address list, got {token:?}"))),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;
    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Vec<FetchItem> {
        parse_fetch_response(&mut Lexer::new(data)).unwrap()
    }

    #[test]
    fn test_flags_uid_size() {
        let items = parse(b"(FLAGS (\\Seen) UID 4827 RFC822.SIZE 4423)");
        assert!(matches!(&items[0], FetchItem::Flags(f) if f.is_seen()));
        assert_eq!(items[1], FetchItem::Uid(4827));
        assert_eq!(items[2], FetchItem::Rfc822Size(4423));
    }

    #[test]
    fn test_body_literal_with_section_and_origin() {
        let items = parse(b"(BODY[HEADER.FIELDS (SUBJECT)]<0> {11}\r\nSubject: x))");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: Some("HEADER.FIELDS (SUBJECT)".into()),
                origin: Some(0),
                data: Some(b"Subject: x)".to_vec()),
            }]
        );
    }

    #[test]
    fn test_nil_body() {
        let items = parse(b"(RFC822.TEXT NIL)");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: None,
                origin: None,
                data: None,
            }]
        );
    }

    #[test]
    fn test_envelope() {
        let items = parse(
            b"(ENVELOPE (\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hi\" ((\"Terry\" NIL \"gray\" \"example.com\")) NIL NIL NIL NIL NIL NIL \"<b27@example.com>\"))",
        );
        let FetchItem::Envelope(env) = &items[0] else {
            panic!("expected envelope");
        };
        assert_eq!(env.subject.as_deref(), Some("Hi"));
        assert_eq!(env.from[0].email().as_deref(), Some("gray@example.com"));
        assert!(env.to.is_empty());
        assert_eq!(env.message_id.as_deref(), Some("<b27@example.com>"));
    }

    #[test]
    fn test_unknown_items_are_kept_raw() {
        let items = parse(b"(X-GM-LABELS (\\Inbox foo) BODYSTRUCTURE (\"text\" \"plain\") UID 9)");
        assert_eq!(
            items[0],
            FetchItem::Other {
                name: "X-GM-LABELS".into(),
                raw: b"(\\Inbox foo)".to_vec(),
            }
        );
        assert!(matches!(&items[1], FetchItem::Other { name, .. } if name == "BODYSTRUCTURE"));
        assert_eq!(items[2], FetchItem::Uid(9));
    }

    #[test]
    fn test_modseq() {
        assert_eq!(parse(b"(MODSEQ (12345678901))"), vec![FetchItem::ModSeq(12_345_678_901)]);
    }
}
