//! Command serialization helpers.

use mailwire_core::{Error, Result};

use super::types::{FetchAttribute, FetchItems, StoreAction};

/// Writes an astring: an atom when possible, otherwise a quoted string.
///
/// CR, LF and NUL cannot be quoted and are refused.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Usage("argument contains CR, LF or NUL".into()));
    }
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

pub fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::All => buf.extend_from_slice(b"ALL"),
        FetchItems::Fast => buf.extend_from_slice(b"FAST"),
        FetchItems::Full => buf.extend_from_slice(b"FULL"),
        FetchItems::Items(attrs) if attrs.len() == 1 => write_fetch_attribute(buf, &attrs[0]),
        FetchItems::Items(attrs) => {
            buf.push(b'(');
            for (i, attr) in attrs.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_fetch_attribute(buf, attr);
            }
            buf.push(b')');
        }
    }
}

fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    let name: &[u8] = match attr {
        FetchAttribute::Flags => b"FLAGS",
        FetchAttribute::InternalDate => b"INTERNALDATE",
        FetchAttribute::Rfc822Size => b"RFC822.SIZE",
        FetchAttribute::Envelope => b"ENVELOPE",
        FetchAttribute::BodyStructure => b"BODYSTRUCTURE",
        FetchAttribute::Uid => b"UID",
        FetchAttribute::Rfc822 => b"RFC822",
        FetchAttribute::Rfc822Header => b"RFC822.HEADER",
        FetchAttribute::ModSeq => b"MODSEQ",
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            let open: &[u8] = if *peek { b"BODY.PEEK[" } else { b"BODY[" };
            buf.extend_from_slice(open);
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
            if let Some((start, len)) = partial {
                buf.extend_from_slice(format!("<{start}.{len}>").as_bytes());
            }
            return;
        }
    };
    buf.extend_from_slice(name);
}

pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    buf.extend_from_slice(action.item().as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.extend_from_slice(b" (");
    for (i, flag) in action.flags().iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}
