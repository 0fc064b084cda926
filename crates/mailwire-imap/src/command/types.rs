//! Command argument types.

use crate::types::Flag;

/// STATUS data item to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
    /// Highest mod-sequence.
    HighestModSeq,
}

impl StatusAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
            Self::HighestModSeq => "HIGHESTMODSEQ",
        }
    }
}

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// `ALL` macro.
    All,
    /// `FAST` macro.
    Fast,
    /// `FULL` macro.
    Full,
    /// Explicit attribute list.
    Items(Vec<FetchAttribute>),
}

/// Single FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// FLAGS
    Flags,
    /// INTERNALDATE
    InternalDate,
    /// RFC822.SIZE
    Rfc822Size,
    /// ENVELOPE
    Envelope,
    /// BODYSTRUCTURE
    BodyStructure,
    /// UID
    Uid,
    /// `BODY[section]<partial>` or `BODY.PEEK[...]`.
    Body {
        /// Section specifier; `None` for the whole message.
        section: Option<String>,
        /// Leave `\Seen` untouched.
        peek: bool,
        /// Origin octet and length.
        partial: Option<(u32, u32)>,
    },
    /// RFC822
    Rfc822,
    /// RFC822.HEADER
    Rfc822Header,
    /// MODSEQ
    ModSeq,
}

/// How STORE changes the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace the flags.
    Set(Vec<Flag>),
    /// Add flags.
    Add(Vec<Flag>),
    /// Remove flags.
    Remove(Vec<Flag>),
}

impl StoreAction {
    pub(crate) const fn item(&self) -> &'static str {
        match self {
            Self::Set(_) => "FLAGS",
            Self::Add(_) => "+FLAGS",
            Self::Remove(_) => "-FLAGS",
        }
    }

    pub(crate) fn flags(&self) -> &[Flag] {
        match self {
            Self::Set(flags) | Self::Add(flags) | Self::Remove(flags) => flags,
        }
    }
}
