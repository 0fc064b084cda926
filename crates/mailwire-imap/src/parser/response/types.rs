//! Response data types.

use mailwire_core::CapabilitySet;

use crate::types::{Flags, ListResponse, Mailbox, ResponseCode, StatusItem};

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    /// `* OK`
    Ok {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH` greeting.
    PreAuth {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`: the server is closing the connection.
    Bye {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY`
    Capability(CapabilitySet),
    /// `* FLAGS`
    Flags(Flags),
    /// `* LIST`
    List(ListResponse),
    /// `* STATUS`
    Status {
        /// Mailbox the items belong to.
        mailbox: Mailbox,
        /// Reported items.
        items: Vec<StatusItem>,
    },
    /// `* SEARCH`
    Search(Vec<u32>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(u32),
    /// `* n FETCH`
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Returned items.
        items: Vec<FetchItem>,
    },
    /// Any other untagged response, as the raw frame.
    Other(Vec<u8>),
}

/// One FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// FLAGS
    Flags(Flags),
    /// UID
    Uid(u32),
    /// RFC822.SIZE
    Rfc822Size(u32),
    /// INTERNALDATE
    InternalDate(String),
    /// ENVELOPE
    Envelope(Box<Envelope>),
    /// MODSEQ
    ModSeq(u64),
    /// `BODY[section]<origin>`, `RFC822`, `RFC822.HEADER` or `RFC822.TEXT`.
    Body {
        /// Section specifier, without brackets.
        section: Option<String>,
        /// Origin octet of a partial fetch.
        origin: Option<u32>,
        /// Section data; `None` for NIL.
        data: Option<Vec<u8>>,
    },
    /// Any other item, with its raw value.
    Other {
        /// Item name.
        name: String,
        /// Raw value bytes.
        raw: Vec<u8>,
    },
}

/// Message envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Envelope address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route.
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// Returns `mailbox@host` when both are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}
