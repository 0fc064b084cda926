//! # mailwire-imap
//!
//! Resumable, non-blocking IMAP4rev1 client (RFC 3501) with STARTTLS.
//!
//! ## Features
//!
//! - **Tagged exchanges**: one outstanding command at a time, completions
//!   matched by tag
//! - **Literals**: `{n}` data is read by length, so CRLF inside a message
//!   never ends a response early
//! - **Mailbox access**: LIST, STATUS, SELECT, EXAMINE, FETCH, STORE,
//!   EXPUNGE, CLOSE
//! - **Sans-I/O parser**: the lexer and response parser work on complete
//!   frames and never touch the network
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_core::{Config, Driver, Protocol};
//! use mailwire_imap::{FetchItems, Imap, SequenceSet};
//!
//! #[tokio::main]
//! async fn main() -> mailwire_imap::Result<()> {
//!     let config = Config::new(Protocol::Imap, "imap.example.com");
//!     let driver = Driver::from_config(&config);
//!     let mut imap = Imap::connect(&config).await?;
//!
//!     driver.run(&mut imap, Imap::open).await?;
//!     driver.run(&mut imap, |c| c.login("alice", "secret")).await?;
//!     let status = driver.run(&mut imap, |c| c.select("INBOX")).await?;
//!     if status.exists > 0 {
//!         let set = SequenceSet::range(1, status.exists).unwrap_or(SequenceSet::All);
//!         let data = driver.run(&mut imap, |c| c.fetch(&set, FetchItems::Fast)).await?;
//!         println!("{} responses", data.len());
//!     }
//!     driver.run(&mut imap, Imap::logout).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: Command builders and tag generation
//! - [`connection`]: The resumable client
//! - [`parser`]: Lexer and response parser
//! - [`types`]: Flags, mailboxes, sequence sets, response codes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, FetchItems, StatusAttribute, StoreAction, TagGenerator};
pub use connection::{Imap, State};
pub use mailwire_core::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, Untagged};
pub use types::{
    Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    SequenceSet, Status, StatusItem,
};
