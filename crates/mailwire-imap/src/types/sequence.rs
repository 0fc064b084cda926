//! Sequence sets for message ranges.

use std::fmt;

/// Message sequence numbers or UIDs.
///
/// Numbers are never zero; the constructors return `None` for zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single number.
    Single(u32),
    /// Inclusive range.
    Range(u32, u32),
    /// From a number to the end of the mailbox (`n:*`).
    RangeFrom(u32),
    /// Every message (`*`).
    All,
    /// Comma-separated union.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a set holding one number.
    #[must_use]
    pub const fn single(n: u32) -> Option<Self> {
        if n == 0 { None } else { Some(Self::Single(n)) }
    }

    /// Creates an inclusive range.
    #[must_use]
    pub const fn range(start: u32, end: u32) -> Option<Self> {
        if start == 0 || end == 0 {
            None
        } else {
            Some(Self::Range(start, end))
        }
    }

    /// Creates `start:*`.
    #[must_use]
    pub const fn from(start: u32) -> Option<Self> {
        if start == 0 { None } else { Some(Self::RangeFrom(start)) }
    }
}

impl fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => f.write_str("*"),
            Self::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}
