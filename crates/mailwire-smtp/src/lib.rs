//! # mailwire-smtp
//!
//! Resumable, non-blocking SMTP client implementing the client side of
//! RFC 5321.
//!
//! ## Features
//!
//! - **Resumable operations**: every call returns [`Error::WouldBlock`] when
//!   the transport has to wait and picks up where it stopped on the next call
//! - **EHLO with HELO fallback**: capabilities are cached until the transport
//!   changes or authentication succeeds
//! - **STARTTLS**: the carrier is rewrapped in place, then EHLO is repeated
//! - **Authentication**: PLAIN and LOGIN, with masked transcripts
//! - **DATA**: dot-stuffing, CRLF normalization and the terminator are handled
//!   for you
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_core::{Config, Driver, Protocol, Security};
//! use mailwire_smtp::{Address, Smtp};
//!
//! #[tokio::main]
//! async fn main() -> mailwire_smtp::Result<()> {
//!     let config = Config::builder(Protocol::Smtp, "smtp.example.com")
//!         .security(Security::StartTls)
//!         .build();
//!     let driver = Driver::from_config(&config);
//!     let mut smtp = Smtp::connect(&config).await?;
//!
//!     driver.run(&mut smtp, Smtp::open).await?;
//!     driver.run(&mut smtp, |c| c.ehlo("client.example.com")).await?;
//!     driver.run(&mut smtp, |c| c.starttls("smtp.example.com")).await?;
//!     driver.run(&mut smtp, |c| c.auth_plain("user@example.com", "password")).await?;
//!
//!     let from = Address::new("sender@example.com")?;
//!     let to = Address::new("recipient@example.com")?;
//!     driver.run(&mut smtp, |c| c.mail_from(&from, &[])).await?;
//!     driver.run(&mut smtp, |c| c.rcpt_to(&to)).await?;
//!     driver.run(&mut smtp, |c| c.data(b"Subject: Test\r\n\r\nHello\r\n")).await?;
//!     driver.run(&mut smtp, Smtp::quit).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: The resumable client and its states
//! - [`parser`]: Reply parser
//! - [`types`]: Addresses, extensions, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
pub mod parser;
pub mod types;

pub use connection::{Smtp, State};
pub use mailwire_core::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
