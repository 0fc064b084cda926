//! SMTP reply parser.
//!
//! Replies are one or more lines of `<3 digits><sep><text>`, where `sep` is
//! `-` on continuation lines and a space on the final line:
//!
//! ```text
//! 250-example.com
//! 250-PIPELINING
//! 250 STARTTLS
//! ```

use mailwire_core::{Error, Result};

use crate::types::{Reply, ReplyCode};

/// One parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    /// Status code.
    pub code: ReplyCode,
    /// True for the final line of a reply.
    pub last: bool,
    /// Text after the separator.
    pub text: String,
}

/// Parses a single reply line.
///
/// A line of exactly three digits is accepted as a final line with empty
/// text.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the line is malformed.
pub fn parse_line(line: &str) -> Result<ReplyLine> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(bad_reply(line));
    }
    let code = ReplyCode::new(
        u16::from(bytes[0] - b'0') * 100 + u16::from(bytes[1] - b'0') * 10 + u16::from(bytes[2] - b'0'),
    );
    let last = match bytes.get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => return Err(bad_reply(line)),
    };
    Ok(ReplyLine {
        code,
        last,
        text: line.get(4..).unwrap_or("").to_string(),
    })
}

/// Parses a complete reply from its raw lines.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if any line is malformed, the codes disagree,
/// or the lines do not end with exactly one final line.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some((last, continuations)) = lines.split_last() else {
        return Err(Error::Protocol("empty reply".into()));
    };
    let last = parse_line(last)?;
    if !last.last {
        return Err(Error::Protocol("reply is missing its final line".into()));
    }

    let mut texts = Vec::with_capacity(lines.len());
    for raw in continuations {
        let line = parse_line(raw)?;
        if line.last {
            return Err(Error::Protocol(format!("final line before end of reply: {raw}")));
        }
        check_code(last.code, line.code)?;
        texts.push(line.text);
    }
    texts.push(last.text);
    Ok(Reply::new(last.code, texts))
}

/// Fails if a continuation code differs from the reply's first code.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on mismatch.
pub fn check_code(expected: ReplyCode, got: ReplyCode) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "reply code {got} does not match {expected}"
        )))
    }
}

fn bad_reply(line: &str) -> Error {
    Error::Protocol(format!("bad reply: {line:?}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_line_forms() {
        let line = parse_line("250-PIPELINING").unwrap();
        assert_eq!(line.code, ReplyCode::OK);
        assert!(!line.last);
        assert_eq!(line.text, "PIPELINING");

        let line = parse_line("220 mail.example.com ESMTP").unwrap();
        assert!(line.last);
        assert_eq!(line.text, "mail.example.com ESMTP");

        let bare = parse_line("250").unwrap();
        assert!(bare.last);
        assert_eq!(bare.text, "");
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        for bad in ["", "25", "ABC OK", "250+oops", "2x0 OK"] {
            assert!(matches!(parse_line(bad), Err(Error::Protocol(_))), "{bad}");
        }
    }

    #[test]
    fn test_ehlo_reply() {
        let reply = parse_reply(&lines(&[
            "250-example.com",
            "250-PIPELINING",
            "250 STARTTLS",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines, vec!["example.com", "PIPELINING", "STARTTLS"]);
    }

    #[test]
    fn test_code_mismatch_is_protocol_error() {
        let err = parse_reply(&lines(&["250-example.com", "251 STARTTLS"])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_structure_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["250-dangling"])).is_err());
        assert!(parse_reply(&lines(&["250 early", "250 late"])).is_err());
    }

    proptest! {
        #[test]
        fn multiline_yields_body_and_final(
            code in 200u16..600,
            body in proptest::collection::vec("[ -~]{0,40}", 0..8),
            last in "[ -~]{0,40}",
        ) {
            let mut raw: Vec<String> = body.iter().map(|t| format!("{code}-{t}")).collect();
            raw.push(format!("{code} {last}"));

            let reply = parse_reply(&raw).unwrap();
            prop_assert_eq!(reply.code.as_u16(), code);
            prop_assert_eq!(&reply.lines[..body.len()], &body[..]);
            prop_assert_eq!(reply.last_line(), last.as_str());
        }

        #[test]
        fn mismatched_continuation_is_rejected(
            first in 200u16..600,
            other in 200u16..600,
        ) {
            prop_assume!(first != other);
            let raw = vec![format!("{first}-a"), format!("{other} b")];
            prop_assert!(matches!(parse_reply(&raw), Err(Error::Protocol(_))));
        }
    }
}
