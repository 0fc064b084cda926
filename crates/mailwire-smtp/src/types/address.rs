//! Envelope addresses.

use std::fmt;

use mailwire_core::{Error, Result};

/// Envelope address as used in `MAIL FROM:<...>` and `RCPT TO:<...>`.
///
/// Only the checks needed to keep the command line well formed are applied;
/// full RFC 5322 address parsing is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] if the address is empty, lacks a single `@`
    /// with non-empty parts, or contains characters that would break the
    /// command line.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        validate(&addr)?;
        Ok(Self(addr))
    }

    /// The null reverse-path `<>` used for bounces.
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Returns true for the null reverse-path.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(addr: &str) -> Result<()> {
    let invalid = |why: &str| Err(Error::Usage(format!("invalid address {addr:?}: {why}")));

    if addr.is_empty() {
        return invalid("empty");
    }
    if addr
        .chars()
        .any(|c| c.is_ascii_control() || c.is_whitespace() || c == '<' || c == '>')
    {
        return invalid("forbidden character");
    }
    match addr.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => invalid("expected local@domain"),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}
