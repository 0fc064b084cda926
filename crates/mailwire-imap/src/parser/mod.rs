//! Sans-I/O parser for IMAP server responses.
//!
//! The client assembles one response frame at a time: a line, and for every
//! line ending in a literal announcement `{n}` the next `n` bytes followed by
//! the continuation of the line. [`literal_len`] tells the reader when a line
//! announces a literal; [`ResponseParser::parse`] then parses the whole frame.
//!
//! ```
//! use mailwire_imap::parser::{Response, ResponseParser, Untagged};
//!
//! let response = ResponseParser::parse(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(Untagged::Exists(3)));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{Address, Envelope, FetchItem, Response, ResponseParser, Untagged};

/// Returns the length of the literal announced at the end of `line`.
///
/// Recognizes `{n}` and the non-synchronizing `{n+}`. The line must not
/// include its CRLF.
#[must_use]
pub fn literal_len(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"}")?;
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    let digits = digits.strip_suffix(b"+").unwrap_or(digits);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn detects_literal_announcements() {
        assert_eq!(literal_len(b"* 1 FETCH (BODY[] {42}"), Some(42));
        assert_eq!(literal_len(b"* LIST () \"/\" {3+}"), Some(3));
        assert_eq!(literal_len(b"{0}"), Some(0));
    }

    #[test]
    fn ignores_other_lines() {
        assert_eq!(literal_len(b"A0001 OK done"), None);
        assert_eq!(literal_len(b"* OK {abc}"), None);
        assert_eq!(literal_len(b"* OK {}"), None);
        assert_eq!(literal_len(b"* OK }"), None);
    }

    proptest! {
        #[test]
        fn parser_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = ResponseParser::parse(&input);
        }

        #[test]
        fn literal_data_is_taken_verbatim(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut frame = format!("* 7 FETCH (BODY[] {{{}}}\r\n", data.len()).into_bytes();
            frame.extend_from_slice(&data);
            frame.extend_from_slice(b")\r\n");
            let Response::Untagged(Untagged::Fetch { items, .. }) =
                ResponseParser::parse(&frame).unwrap()
            else {
                panic!("expected FETCH");
            };
            let expected = FetchItem::Body {
                section: Some(String::new()),
                origin: None,
                data: Some(data),
            };
            prop_assert_eq!(&items[0], &expected);
        }
    }
}
