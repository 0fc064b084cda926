//! # mailwire-pop3
//!
//! Resumable, non-blocking POP3 client (RFC 1939) with CAPA (RFC 2449) and
//! STLS (RFC 2595).
//!
//! ## Features
//!
//! - **Resumable operations**: [`Error::WouldBlock`] leaves the operation
//!   exactly where it stopped, partial multi-line bodies included
//! - **Authentication**: USER/PASS with masked transcripts, and APOP using the
//!   greeting timestamp
//! - **Maildrop access**: STAT, LIST, UIDL, RETR, TOP, DELE, RSET
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_core::{Config, Driver, Protocol};
//! use mailwire_pop3::Pop3;
//!
//! #[tokio::main]
//! async fn main() -> mailwire_pop3::Result<()> {
//!     let config = Config::new(Protocol::Pop3, "pop.example.com");
//!     let driver = Driver::from_config(&config);
//!     let mut pop = Pop3::connect(&config).await?;
//!
//!     driver.run(&mut pop, Pop3::open).await?;
//!     driver.run(&mut pop, |c| c.user("alice")).await?;
//!     driver.run(&mut pop, |c| c.pass("secret")).await?;
//!     let stat = driver.run(&mut pop, Pop3::stat).await?;
//!     for n in 1..=stat.count {
//!         let message = driver.run(&mut pop, |c| c.retr(n)).await?;
//!         println!("{n}: {} octets", message.len());
//!     }
//!     driver.run(&mut pop, Pop3::quit).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
pub mod parser;
pub mod types;

pub use connection::{Pop3, State};
pub use mailwire_core::{Error, Result};
pub use types::{ListEntry, Stat, UidlEntry};
