//! Core IMAP types.

mod flags;
mod mailbox;
mod response_code;
mod sequence;
mod status;

pub use flags::{Flag, Flags};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus, StatusItem};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;
pub use status::Status;
