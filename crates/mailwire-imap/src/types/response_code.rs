//! Response codes.

use mailwire_core::CapabilitySet;

use super::Flags;

/// Bracketed response code of a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: text that must be shown to the user.
    Alert,
    /// CAPABILITY list sent inline.
    Capability(CapabilitySet),
    /// PARSE: the server could not parse a message.
    Parse,
    /// PERMANENTFLAGS.
    PermanentFlags(Flags),
    /// READ-ONLY.
    ReadOnly,
    /// READ-WRITE.
    ReadWrite,
    /// TRYCREATE: the target mailbox does not exist.
    TryCreate,
    /// UIDNEXT.
    UidNext(u32),
    /// UIDVALIDITY.
    UidValidity(u32),
    /// UNSEEN: first unseen message.
    Unseen(u32),
    /// HIGHESTMODSEQ (CONDSTORE).
    HighestModSeq(u64),
    /// NOMODSEQ.
    NoModSeq,
    /// Anything else; the atom is kept verbatim.
    Other(String),
}
