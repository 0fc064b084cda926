//! # mailwire-core
//!
//! The engine shared by the mailwire SMTP, POP3, IMAP4 and NNTP clients.
//!
//! Every protocol operation is an explicit, resumable state machine. A call
//! performs as much I/O as the transport allows and returns
//! [`Error::WouldBlock`] when it has to wait; calling the same operation again
//! resumes exactly where it stopped, without re-sending anything.
//!
//! ## Features
//!
//! - **Non-blocking line I/O**: growable read buffer, partial-write tracking
//! - **Single-owner carrier**: STARTTLS rewraps the stream by move
//! - **Capability cache**: case-insensitive keyword lookup, invalidated on
//!   transport change
//! - **Transcripts**: `C:`/`S:` mirroring with credential masking
//! - **Error latch**: a fatal failure makes every later call fail fast
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_core::{Config, Driver, Protocol, Security, net};
//! use mailwire_smtp::Smtp;
//!
//! #[tokio::main]
//! async fn main() -> mailwire_core::Result<()> {
//!     let config = Config::builder(Protocol::Smtp, "smtp.example.com")
//!         .security(Security::StartTls)
//!         .build();
//!     let driver = Driver::from_config(&config);
//!
//!     let mut smtp = Smtp::new(net::connect(&config).await?);
//!     driver.run(&mut smtp, Smtp::open).await?;
//!     driver.run(&mut smtp, |c| c.ehlo("client.example.com")).await?;
//!     driver.run(&mut smtp, |c| c.starttls("smtp.example.com")).await?;
//!     driver.run(&mut smtp, Smtp::quit).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`capability`]: Server capability cache
//! - [`carrier`]: Plain/TLS transport plus transcript
//! - [`config`]: Connection configuration
//! - [`dot`]: Dot-stuffing for message bodies
//! - [`driver`]: Async re-invocation loop
//! - [`line`]: Buffered line I/O
//! - [`net`]: TCP transport
//! - [`session`]: Session state, operation sequencing and the error latch
//! - [`transcript`]: Protocol transcripts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod carrier;
pub mod config;
pub mod dot;
pub mod driver;
mod error;
mod flags;
pub mod line;
pub mod net;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transcript;

pub use capability::CapabilitySet;
pub use carrier::{Carrier, Transport, default_tls_config};
pub use config::{Config, ConfigBuilder, Protocol, Security};
pub use driver::{Client, Driver, Readiness};
pub use error::{Error, Result};
pub use flags::SessionFlags;
pub use line::{Direction, LineIo};
pub use session::{LastReply, OpState, Session};
pub use transcript::{Level, MemorySink, TraceMask, TracingSink, Transcript, TranscriptSink, WriterSink};
