#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: log in over implicit TLS and summarize the maildrop.
//!
//! ## Running
//!
//! ```bash
//! MAILWIRE_HOST=pop.example.com MAILWIRE_USER=alice MAILWIRE_PASS=secret \
//! RUST_LOG=mailwire=debug cargo run --package mailwire-pop3 --example check_maildrop
//! ```

use std::env;

use mailwire_core::{Config, Driver, Protocol, TraceMask};
use mailwire_pop3::Pop3;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = env::var("MAILWIRE_HOST")?;
    let user = env::var("MAILWIRE_USER")?;
    let pass = env::var("MAILWIRE_PASS")?;

    let config = Config::builder(Protocol::Pop3, &host)
        .trace(TraceMask::default())
        .build();
    let driver = Driver::from_config(&config);
    let mut pop = Pop3::connect(&config).await?;

    println!("{}", driver.run(&mut pop, Pop3::open).await?);
    driver.run(&mut pop, |c| c.user(&user)).await?;
    driver.run(&mut pop, |c| c.pass(&pass)).await?;

    let stat = driver.run(&mut pop, Pop3::stat).await?;
    println!("{} messages, {} octets", stat.count, stat.size);
    for entry in driver.run(&mut pop, Pop3::uidl_all).await? {
        println!("{:>6} {}", entry.number, entry.uid);
    }

    println!("{}", driver.run(&mut pop, Pop3::quit).await?);
    Ok(())
}
