#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: submit one message over STARTTLS with AUTH PLAIN.
//!
//! ## Running
//!
//! ```bash
//! MAILWIRE_HOST=smtp.example.com MAILWIRE_USER=alice MAILWIRE_PASS=secret \
//! MAILWIRE_FROM=alice@example.com MAILWIRE_TO=bob@example.com \
//! RUST_LOG=mailwire=debug cargo run --package mailwire-smtp --example send_message
//! ```

use std::env;

use mailwire_core::{Config, Driver, Protocol, Security, TraceMask};
use mailwire_smtp::{Address, Smtp};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = env::var("MAILWIRE_HOST")?;
    let user = env::var("MAILWIRE_USER")?;
    let pass = env::var("MAILWIRE_PASS")?;
    let from = Address::new(env::var("MAILWIRE_FROM")?)?;
    let to = Address::new(env::var("MAILWIRE_TO")?)?;

    let config = Config::builder(Protocol::Smtp, &host)
        .port(587)
        .security(Security::StartTls)
        .trace(TraceMask::default())
        .build();
    let driver = Driver::from_config(&config);
    let mut smtp = Smtp::connect(&config).await?;

    driver.run(&mut smtp, Smtp::open).await?;
    driver.run(&mut smtp, |c| c.ehlo("localhost")).await?;
    driver.run(&mut smtp, |c| c.starttls(&host)).await?;
    driver.run(&mut smtp, |c| c.auth_plain(&user, &pass)).await?;

    let message = format!(
        "From: {from}\r\nTo: {to}\r\nSubject: mailwire test\r\n\r\nSent by the send_message example.\r\n",
        from = from.as_str(),
        to = to.as_str(),
    );
    driver.run(&mut smtp, |c| c.mail_from(&from, &[])).await?;
    driver.run(&mut smtp, |c| c.rcpt_to(&to)).await?;
    let reply = driver.run(&mut smtp, |c| c.data(message.as_bytes())).await?;
    println!("queued: {}", reply.text());

    driver.run(&mut smtp, Smtp::quit).await?;
    Ok(())
}
