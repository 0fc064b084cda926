//! Dot-stuffing for message payloads (RFC 5321 §4.5.2, RFC 1939, RFC 3977).
//!
//! Outgoing payloads double any leading `.` and end with `CRLF.CRLF`.
//! Incoming multi-line bodies end at a line holding a single `.` and have one
//! leading dot removed from every other dot-prefixed line.

/// Streaming dot-stuffing encoder that also normalizes line endings to CRLF.
#[derive(Debug, Clone, Copy)]
pub struct DotStuffer {
    at_line_start: bool,
    held_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            at_line_start: true,
            held_cr: false,
        }
    }
}

impl DotStuffer {
    /// Creates an encoder positioned at the start of a line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes one chunk of the message into `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.reserve(chunk.len() + chunk.len() / 64);
        for &b in chunk {
            if b == b'\n' {
                out.extend_from_slice(b"\r\n");
                self.held_cr = false;
                self.at_line_start = true;
                continue;
            }
            if self.held_cr {
                out.push(b'\r');
                self.held_cr = false;
                self.at_line_start = false;
            }
            if b == b'\r' {
                self.held_cr = true;
                continue;
            }
            if self.at_line_start && b == b'.' {
                out.push(b'.');
            }
            out.push(b);
            self.at_line_start = false;
        }
    }

    /// Terminates the last line if needed and appends the `.` terminator.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.held_cr || !self.at_line_start {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b".\r\n");
        *self = Self::default();
    }
}

/// Encodes a complete message, terminator included.
#[must_use]
pub fn stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 5);
    let mut stuffer = DotStuffer::new();
    stuffer.push(message, &mut out);
    stuffer.finish(&mut out);
    out
}

/// Decodes one line of a multi-line body.
///
/// Returns `None` for the terminating `.` line.
#[must_use]
pub fn unstuff(line: &[u8]) -> Option<&[u8]> {
    match line {
        b"." => None,
        [b'.', rest @ ..] => Some(rest),
        _ => Some(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn doubles_leading_dots() {
        assert_eq!(stuff(b"a\r\n.b\r\n..c\r\n"), b"a\r\n..b\r\n...c\r\n.\r\n");
    }

    #[test]
    fn normalizes_bare_lf_and_terminates() {
        assert_eq!(stuff(b"one\ntwo"), b"one\r\ntwo\r\n.\r\n");
    }

    #[test]
    fn leading_dot_on_first_line() {
        assert_eq!(stuff(b".hidden\r\n"), b"..hidden\r\n.\r\n");
    }

    #[test]
    fn dot_split_across_chunks() {
        let mut out = Vec::new();
        let mut stuffer = DotStuffer::new();
        stuffer.push(b"line\r", &mut out);
        stuffer.push(b"\n.", &mut out);
        stuffer.push(b"x", &mut out);
        stuffer.finish(&mut out);
        assert_eq!(out, b"line\r\n..x\r\n.\r\n");
    }

    #[test]
    fn lone_cr_is_kept() {
        assert_eq!(stuff(b"a\rb\r\n"), b"a\rb\r\n.\r\n");
    }

    #[test]
    fn unstuff_strips_one_dot() {
        assert_eq!(unstuff(b"..b"), Some(&b".b"[..]));
        assert_eq!(unstuff(b"plain"), Some(&b"plain"[..]));
        assert_eq!(unstuff(b"."), None);
        assert_eq!(unstuff(b""), Some(&b""[..]));
    }

    proptest! {
        #[test]
        fn no_terminator_inside_stuffed_body(message in proptest::collection::vec(
            prop_oneof![Just(b'.'), Just(b'\n'), Just(b'a')],
            0..64,
        )) {
            let out = stuff(&message);
            prop_assert!(out.ends_with(b".\r\n"));
            let body = &out[..out.len() - 3];
            for line in body.split(|&b| b == b'\n') {
                prop_assert_ne!(line, b".\r");
            }
        }
    }
}
