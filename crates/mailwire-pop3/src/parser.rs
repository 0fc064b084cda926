//! POP3 response parser.
//!
//! Every response starts with a status line, `+OK` or `-ERR` followed by
//! optional text. Multi-line responses continue with dot-stuffed lines up to
//! a lone `.`; the session reads and un-stuffs those.

use md5::{Digest, Md5};
use mailwire_core::{Error, Result};

use crate::types::{ListEntry, Stat, UidlEntry};

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// True for `+OK`.
    pub ok: bool,
    /// Text after the status indicator.
    pub text: String,
}

impl StatusLine {
    /// Returns the status indicator as sent.
    #[must_use]
    pub const fn indicator(&self) -> &'static str {
        if self.ok { "+OK" } else { "-ERR" }
    }

    /// Converts a negative status into [`Error::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns the rejection for `-ERR`.
    pub fn into_result(self) -> Result<String> {
        if self.ok {
            Ok(self.text)
        } else {
            Err(Error::rejected(self.indicator(), self.text))
        }
    }
}

/// Parses a status line.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the line starts with neither `+OK` nor
/// `-ERR`.
pub fn parse_status(line: &str) -> Result<StatusLine> {
    for (indicator, ok) in [("+OK", true), ("-ERR", false)] {
        let Some(head) = line.get(..indicator.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(indicator) {
            continue;
        }
        let rest = &line[indicator.len()..];
        if !rest.is_empty() && !rest.starts_with(' ') {
            break;
        }
        return Ok(StatusLine {
            ok,
            text: rest.trim_start_matches(' ').to_string(),
        });
    }
    Err(Error::Protocol(format!("bad status line: {line:?}")))
}

fn fields<'a, const N: usize>(text: &'a str, what: &str) -> Result<[&'a str; N]> {
    let mut words = text.split_ascii_whitespace();
    let mut out = [""; N];
    for slot in &mut out {
        *slot = words
            .next()
            .ok_or_else(|| Error::Protocol(format!("short {what} line: {text:?}")))?;
    }
    Ok(out)
}

fn number<T: std::str::FromStr>(word: &str, what: &str) -> Result<T> {
    word.parse()
        .map_err(|_| Error::Protocol(format!("bad number in {what}: {word:?}")))
}

/// Parses the text of a `STAT` reply, e.g. `2 320`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the count or size is missing or malformed.
pub fn parse_stat(text: &str) -> Result<Stat> {
    let [count, size] = fields(text, "STAT")?;
    Ok(Stat {
        count: number(count, "STAT")?,
        size: number(size, "STAT")?,
    })
}

/// Parses a scan listing, e.g. `1 120`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on a malformed listing.
pub fn parse_listing(text: &str) -> Result<ListEntry> {
    let [msg, size] = fields(text, "LIST")?;
    Ok(ListEntry {
        number: number(msg, "LIST")?,
        size: number(size, "LIST")?,
    })
}

/// Parses a unique-id listing, e.g. `1 whqtswO00WBw418f9t5JxYwZ`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on a malformed listing.
pub fn parse_uidl(text: &str) -> Result<UidlEntry> {
    let [msg, uid] = fields(text, "UIDL")?;
    Ok(UidlEntry {
        number: number(msg, "UIDL")?,
        uid: uid.to_string(),
    })
}

/// Extracts the APOP timestamp, angle brackets included, from a greeting.
#[must_use]
pub fn apop_timestamp(greeting: &str) -> Option<&str> {
    let start = greeting.find('<')?;
    let len = greeting[start..].find('>')?;
    let stamp = &greeting[start..=start + len];
    stamp.contains('@').then_some(stamp)
}

/// Computes the APOP digest: lowercase hex MD5 of timestamp and secret.
#[must_use]
pub fn apop_digest(timestamp: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_lines() {
        let ok = parse_status("+OK 2 messages (320 octets)").unwrap();
        assert!(ok.ok);
        assert_eq!(ok.text, "2 messages (320 octets)");

        let bare = parse_status("+OK").unwrap();
        assert!(bare.ok);
        assert!(bare.text.is_empty());

        let err = parse_status("-ERR no such message").unwrap();
        assert!(!err.ok);
        assert!(matches!(
            err.into_result(),
            Err(Error::Rejected { status, text }) if status == "-ERR" && text == "no such message"
        ));
    }

    #[test]
    fn test_bad_status_lines() {
        for bad in ["", "OK", "+OKAY", "* OK", "-ER"] {
            assert!(matches!(parse_status(bad), Err(Error::Protocol(_))), "{bad}");
        }
    }

    #[test]
    fn test_stat_and_listings() {
        assert_eq!(parse_stat("2 320").unwrap(), Stat { count: 2, size: 320 });
        assert!(parse_stat("2").is_err());
        assert!(parse_stat("two 320").is_err());

        let entry = parse_listing("1 120").unwrap();
        assert_eq!((entry.number, entry.size), (1, 120));

        let uid = parse_uidl("2 QhdPYR:00WBw1Ph7x7").unwrap();
        assert_eq!(uid.number, 2);
        assert_eq!(uid.uid, "QhdPYR:00WBw1Ph7x7");
    }

    #[test]
    fn test_apop() {
        let greeting = "POP3 server ready <1896.697170952@dbc.mtview.ca.us>";
        let stamp = apop_timestamp(greeting).unwrap();
        assert_eq!(stamp, "<1896.697170952@dbc.mtview.ca.us>");
        assert_eq!(
            apop_digest(stamp, "tanstaaf"),
            "c4c9334bac560ecc979e58001b3e22fb"
        );
        assert_eq!(apop_timestamp("POP3 ready"), None);
        assert_eq!(apop_timestamp("ready <no-at-sign>"), None);
    }

    proptest! {
        #[test]
        fn status_text_survives(text in "[ -~]{0,60}") {
            let line = format!("+OK {text}");
            let status = parse_status(&line).unwrap();
            prop_assert!(status.ok);
            prop_assert_eq!(status.text, text.trim_start_matches(' '));
        }
    }
}
