#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: log in over STARTTLS and list mailboxes with their status.
//!
//! ## Running
//!
//! ```bash
//! MAILWIRE_HOST=imap.example.com MAILWIRE_USER=alice MAILWIRE_PASS=secret \
//! RUST_LOG=mailwire=debug cargo run --package mailwire-imap --example list_mailboxes
//! ```

use std::env;

use mailwire_core::{Config, Driver, Protocol, Security, TraceMask};
use mailwire_imap::{Imap, MailboxAttribute, StatusAttribute, StatusItem};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = env::var("MAILWIRE_HOST")?;
    let user = env::var("MAILWIRE_USER")?;
    let pass = env::var("MAILWIRE_PASS")?;

    let config = Config::builder(Protocol::Imap, &host)
        .security(Security::StartTls)
        .trace(TraceMask::default())
        .build();
    let driver = Driver::from_config(&config);
    let mut imap = Imap::connect(&config).await?;

    println!("{}", driver.run(&mut imap, Imap::open).await?);
    let starttls = driver
        .run(&mut imap, |c| c.capability(false).map(|caps| caps.contains("STARTTLS")))
        .await?;
    if !starttls {
        return Err(format!("{host} does not offer STARTTLS").into());
    }
    driver.run(&mut imap, |c| c.starttls(&host)).await?;
    driver.run(&mut imap, |c| c.login(&user, &pass)).await?;

    let items = [StatusAttribute::Messages, StatusAttribute::Unseen];
    for folder in driver.run(&mut imap, |c| c.list("", "*")).await? {
        if folder.attributes.contains(&MailboxAttribute::NoSelect) {
            continue;
        }
        let name = folder.mailbox.as_str();
        let status = driver.run(&mut imap, |c| c.status(name, &items)).await?;
        let mut messages = 0;
        let mut unseen = 0;
        for item in status {
            match item {
                StatusItem::Messages(n) => messages = n,
                StatusItem::Unseen(n) => unseen = n,
                _ => {}
            }
        }
        println!("{:<40} {:>6} messages {:>6} unseen", name, messages, unseen);
    }

    driver.run(&mut imap, Imap::logout).await?;
    Ok(())
}
