//! # mailwire-nntp
//!
//! Resumable, non-blocking NNTP reader client (RFC 3977) with STARTTLS
//! (RFC 4642) and AUTHINFO USER/PASS (RFC 4643).
//!
//! ## Features
//!
//! - **Numeric status codes**: a fixed set of codes announces a
//!   dot-terminated body; any other success code is a single line
//! - **Reading**: GROUP, ARTICLE, HEAD, BODY, STAT, NEXT, LAST, LIST ACTIVE
//! - **Posting**: POST with dot-stuffing, gated on the greeting's posting flag
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_core::{Config, Driver, Protocol};
//! use mailwire_nntp::Nntp;
//!
//! #[tokio::main]
//! async fn main() -> mailwire_nntp::Result<()> {
//!     let config = Config::new(Protocol::Nntp, "news.example.com");
//!     let driver = Driver::from_config(&config);
//!     let mut news = Nntp::connect(&config).await?;
//!
//!     driver.run(&mut news, Nntp::open).await?;
//!     driver.run(&mut news, Nntp::mode_reader).await?;
//!     let group = driver.run(&mut news, |c| c.group("misc.test")).await?;
//!     let head = driver.run(&mut news, |c| c.head(group.high)).await?;
//!     println!("{}", String::from_utf8_lossy(&head.content));
//!     driver.run(&mut news, Nntp::quit).await?;
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

pub use connection::{Nntp, State};
pub use mailwire_core::{Error, Result};
pub use types::{
    ActiveGroup, Article, ArticleId, ArticlePointer, GroupInfo, PostingStatus, ServerDate,
};
