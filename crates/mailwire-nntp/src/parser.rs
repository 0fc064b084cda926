//! NNTP response parser.
//!
//! Every response starts with a status line: three digits, then optional
//! text. A fixed set of codes announces a dot-terminated body; the session
//! reads and un-stuffs it.

use mailwire_core::{Error, Result};

use crate::types::{ActiveGroup, ArticlePointer, GroupInfo, PostingStatus, ServerDate};

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Three-digit status code.
    pub code: u16,
    /// Text after the code.
    pub text: String,
}

impl StatusLine {
    /// Returns true if a dot-terminated body follows this status.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        is_multiline(self.code)
    }

    /// Converts the status into [`Error::Rejected`].
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::rejected(self.code.to_string(), self.text)
    }
}

/// Returns true for status codes followed by a multi-line body.
#[must_use]
pub const fn is_multiline(code: u16) -> bool {
    matches!(code, 100 | 101 | 215 | 220 | 221 | 222 | 224 | 225 | 230 | 231)
}

/// Parses a status line.
///
/// # Errors
///
/// [`Error::Protocol`] unless the line starts with exactly three digits
/// followed by a space or the end of the line.
pub fn parse_status(line: &str) -> Result<StatusLine> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::Protocol(format!("bad status line: {line:?}")));
    }
    let text = match bytes.get(3) {
        None => "",
        Some(b' ') => &line[4..],
        Some(_) => return Err(Error::Protocol(format!("bad status line: {line:?}"))),
    };
    let code = line[..3]
        .parse()
        .map_err(|_| Error::Protocol(format!("bad status code: {line:?}")))?;
    Ok(StatusLine {
        code,
        text: text.to_string(),
    })
}

fn field_number(field: Option<&str>, what: &str) -> Result<u64> {
    field
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("missing or invalid {what}")))
}

/// Parses the text of a 211 reply: `count low high group`.
///
/// # Errors
///
/// [`Error::Protocol`] if a field is missing or not a number.
pub fn parse_group(text: &str) -> Result<GroupInfo> {
    let mut fields = text.split_ascii_whitespace();
    let count = field_number(fields.next(), "article count")?;
    let low = field_number(fields.next(), "low water mark")?;
    let high = field_number(fields.next(), "high water mark")?;
    let name = fields
        .next()
        .ok_or_else(|| Error::Protocol("missing group name".into()))?;
    Ok(GroupInfo {
        count,
        low,
        high,
        name: name.to_string(),
    })
}

/// Parses the text of a 220-223 reply: `n message-id`.
///
/// # Errors
///
/// [`Error::Protocol`] if the number or message-id is missing.
pub fn parse_pointer(text: &str) -> Result<ArticlePointer> {
    let mut fields = text.split_ascii_whitespace();
    let number = field_number(fields.next(), "article number")?;
    let message_id = fields
        .next()
        .filter(|id| id.starts_with('<') && id.ends_with('>'))
        .ok_or_else(|| Error::Protocol("missing message-id".into()))?;
    Ok(ArticlePointer {
        number,
        message_id: message_id.to_string(),
    })
}

/// Parses one `LIST ACTIVE` line: `group high low status`.
///
/// # Errors
///
/// [`Error::Protocol`] if a field is missing or not a number.
pub fn parse_active(line: &str) -> Result<ActiveGroup> {
    let mut fields = line.split_ascii_whitespace();
    let name = fields
        .next()
        .ok_or_else(|| Error::Protocol("empty LIST ACTIVE line".into()))?;
    let high = field_number(fields.next(), "high water mark")?;
    let low = field_number(fields.next(), "low water mark")?;
    let status = fields
        .next()
        .ok_or_else(|| Error::Protocol("missing posting status".into()))?;
    Ok(ActiveGroup {
        name: name.to_string(),
        high,
        low,
        status: PostingStatus::parse(status),
    })
}

/// Parses the text of a 111 reply: `yyyymmddhhmmss`.
///
/// # Errors
///
/// [`Error::Protocol`] if the timestamp is malformed or out of range.
pub fn parse_date(text: &str) -> Result<ServerDate> {
    let stamp = text.split_ascii_whitespace().next().unwrap_or_default();
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("bad DATE reply: {text:?}")));
    }
    let field = |range: std::ops::Range<usize>| stamp[range].parse::<u8>().unwrap_or(u8::MAX);
    let date = ServerDate {
        year: stamp[..4].parse().unwrap_or_default(),
        month: field(4..6),
        day: field(6..8),
        hour: field(8..10),
        minute: field(10..12),
        second: field(12..14),
    };
    let valid = (1..=12).contains(&date.month)
        && (1..=31).contains(&date.day)
        && date.hour < 24
        && date.minute < 60
        && date.second <= 60;
    if valid {
        Ok(date)
    } else {
        Err(Error::Protocol(format!("DATE out of range: {stamp}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_lines() {
        let status = parse_status("200 news.example.com ready").unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.text, "news.example.com ready");
        assert!(!status.is_multiline());

        let bare = parse_status("205").unwrap();
        assert_eq!(bare.code, 205);
        assert!(bare.text.is_empty());

        assert!(parse_status("215 list follows").unwrap().is_multiline());
    }

    #[test]
    fn test_bad_status_lines() {
        for bad in ["", "20", "2000 x", "abc def", "+OK", "20x ready"] {
            assert!(matches!(parse_status(bad), Err(Error::Protocol(_))), "{bad}");
        }
    }

    #[test]
    fn test_rejection_carries_code() {
        let err = parse_status("411 no such group").unwrap().into_error();
        assert!(matches!(
            err,
            Error::Rejected { status, text } if status == "411" && text == "no such group"
        ));
    }

    #[test]
    fn test_group() {
        assert_eq!(
            parse_group("1234 3000234 3002322 misc.test").unwrap(),
            GroupInfo {
                count: 1234,
                low: 3_000_234,
                high: 3_002_322,
                name: "misc.test".into(),
            }
        );
        assert!(parse_group("0 0 0").is_err());
        assert!(parse_group("x 1 2 misc.test").is_err());
    }

    #[test]
    fn test_pointer() {
        let pointer = parse_pointer("3000234 <45223423@example.com> article retrieved").unwrap();
        assert_eq!(pointer.number, 3_000_234);
        assert_eq!(pointer.message_id, "<45223423@example.com>");
        assert!(parse_pointer("12 no-brackets@example.com").is_err());
        assert!(parse_pointer("12").is_err());
    }

    #[test]
    fn test_active() {
        let group = parse_active("misc.test 3002322 3000234 y").unwrap();
        assert_eq!(group.name, "misc.test");
        assert_eq!((group.high, group.low), (3_002_322, 3_000_234));
        assert_eq!(group.status, PostingStatus::Allowed);
        assert_eq!(
            parse_active("comp.mod 10 1 m").unwrap().status,
            PostingStatus::Moderated
        );
        assert_eq!(
            parse_active("alt.x 10 1 x").unwrap().status,
            PostingStatus::Other('x')
        );
        assert!(parse_active("misc.test 1 2").is_err());
    }

    #[test]
    fn test_date() {
        let date = parse_date("19990623135624").unwrap();
        assert_eq!(date.year, 1999);
        assert_eq!((date.month, date.day), (6, 23));
        assert_eq!((date.hour, date.minute, date.second), (13, 56, 24));
        assert_eq!(date.to_string(), "1999-06-23 13:56:24 UTC");

        assert!(parse_date("1999062313562").is_err());
        assert!(parse_date("19991323135624").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    proptest! {
        #[test]
        fn status_code_and_text_survive(code in 100u16..600, text in "[ -~]{0,60}") {
            let status = parse_status(&format!("{code} {text}")).unwrap();
            prop_assert_eq!(status.code, code);
            prop_assert_eq!(status.text, text);
        }

        #[test]
        fn status_parser_never_panics(line in "\\PC{0,20}") {
            let _ = parse_status(&line);
        }
    }
}
