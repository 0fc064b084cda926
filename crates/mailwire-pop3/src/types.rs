//! POP3 response types.

/// Maildrop summary from `STAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}

/// One `LIST` entry: message number and size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
    /// Message number.
    pub number: u32,
    /// Size in octets.
    pub size: u64,
}

/// One `UIDL` entry: message number and unique-id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidlEntry {
    /// Message number.
    pub number: u32,
    /// Server-assigned unique-id.
    pub uid: String,
}
