#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: print the subjects of the newest articles in a newsgroup.
//!
//! ## Running
//!
//! ```bash
//! MAILWIRE_HOST=news.example.com MAILWIRE_GROUP=misc.test \
//! RUST_LOG=mailwire=debug cargo run --package mailwire-nntp --example group_headers
//! ```

use std::env;

use mailwire_core::{Config, Driver, Protocol, TraceMask};
use mailwire_nntp::{Error, Nntp};
use tracing_subscriber::EnvFilter;

const NEWEST: u64 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = env::var("MAILWIRE_HOST")?;
    let group = env::var("MAILWIRE_GROUP").unwrap_or_else(|_| "misc.test".to_string());

    let config = Config::builder(Protocol::Nntp, &host)
        .trace(TraceMask::default())
        .build();
    let driver = Driver::from_config(&config);
    let mut news = Nntp::connect(&config).await?;

    println!("{}", driver.run(&mut news, Nntp::open).await?);
    driver.run(&mut news, Nntp::mode_reader).await?;
    let info = driver.run(&mut news, |c| c.group(&group)).await?;
    println!("{}: {} articles, {}-{}", info.name, info.count, info.low, info.high);

    let first = info.high.saturating_sub(NEWEST - 1).max(info.low);
    for number in first..=info.high {
        match driver.run(&mut news, |c| c.head(number)).await {
            Ok(head) => {
                let text = String::from_utf8_lossy(&head.content);
                let subject = text
                    .lines()
                    .find_map(|l| l.strip_prefix("Subject: "))
                    .unwrap_or("(no subject)");
                println!("{:>10} {}", number, subject);
            }
            // Expired or cancelled articles leave gaps in the numbering.
            Err(Error::Rejected { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    driver.run(&mut news, Nntp::quit).await?;
    Ok(())
}
