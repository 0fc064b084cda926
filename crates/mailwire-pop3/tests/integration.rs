//! Integration tests for the POP3 client against a scripted mock carrier.

#![allow(clippy::unwrap_used)]

use mailwire_core::testing::MockStream;
use mailwire_core::{Carrier, Client, Error, MemorySink, SessionFlags, TraceMask};
use mailwire_pop3::{Pop3, Stat};

fn pop3(mock: &MockStream) -> Pop3<MockStream> {
    Pop3::new(Carrier::new(mock.clone()))
}

#[test]
fn login_and_download() {
    let mock = MockStream::new()
        .read(b"+OK POP3 ready\r\n")
        .read(b"+OK send PASS\r\n")
        .read(b"+OK logged in\r\n")
        .read(b"+OK 1 57\r\n")
        .read(b"+OK 1 abc123\r\n")
        .read(b"+OK message follows\r\nFrom: a@example.com\r\n\r\nhello\r\n.\r\n")
        .read(b"+OK deleted\r\n")
        .read(b"+OK bye\r\n");
    let mut client = pop3(&mock);

    client.open().unwrap();
    client.user("alice").unwrap();
    client.pass("hunter2").unwrap();
    assert_eq!(client.stat().unwrap(), Stat { count: 1, size: 57 });
    assert_eq!(client.uidl(1).unwrap().uid, "abc123");
    assert_eq!(
        client.retr(1).unwrap(),
        b"From: a@example.com\r\n\r\nhello\r\n"
    );
    client.dele(1).unwrap();
    assert_eq!(client.quit().unwrap(), "bye");
    assert!(!client.session().flags().contains(SessionFlags::CONNECTED));

    assert_eq!(
        mock.written_str(),
        "USER alice\r\nPASS hunter2\r\nSTAT\r\nUIDL 1\r\nRETR 1\r\nDELE 1\r\nQUIT\r\n"
    );
}

#[test]
fn capa_is_cached_and_invalidated_by_login() {
    let mock = MockStream::new()
        .read(b"+OK capability list follows\r\nUSER\r\nSTLS\r\nUIDL\r\nSASL PLAIN\r\n.\r\n")
        .read(b"+OK\r\n")
        .read(b"+OK\r\n")
        .read(b"+OK\r\nUIDL\r\nTOP\r\n.\r\n");
    let mut client = pop3(&mock);

    let caps = client.capa(false).unwrap();
    assert!(caps.contains("stls"));
    assert_eq!(caps.value("SASL"), Some("PLAIN"));

    let calls = mock.io_calls();
    assert_eq!(client.capa(false).unwrap().len(), 4);
    assert_eq!(mock.io_calls(), calls);

    client.user("alice").unwrap();
    client.pass("hunter2").unwrap();
    assert!(client.session().capabilities().is_none());

    let caps = client.capa(false).unwrap();
    assert!(caps.contains("TOP"));
    assert!(!caps.contains("STLS"));
}

#[test]
fn pass_is_masked_in_transcript() {
    let mock = MockStream::new()
        .read(b"+OK\r\n")
        .read(b"+OK welcome\r\n");
    let mut client = pop3(&mock);
    let sink = MemorySink::new();
    client
        .session_mut()
        .enable_trace(sink.clone(), TraceMask::default())
        .unwrap();

    client.user("alice").unwrap();
    client.pass("hunter2").unwrap();
    assert_eq!(
        sink.lines(),
        vec!["C: USER alice", "S: +OK", "C: PASS ***", "S: +OK welcome"]
    );
}

#[test]
fn uidl_all_unstuffs_and_stops_at_dot() {
    let mock = MockStream::new()
        .read(b"+OK\r\n1 whqtswO00WBw418f9t5JxYwZ\r\n2 QhdPYR:00WBw1Ph7x7\r\n.\r\n+OK\r\n");
    let mut client = pop3(&mock);

    let uids = client.uidl_all().unwrap();
    assert_eq!(uids.len(), 2);
    assert_eq!(uids[1].uid, "QhdPYR:00WBw1Ph7x7");
    // The next response is still buffered, not swallowed by the listing.
    client.noop().unwrap();
}

#[test]
fn top_resumes_across_would_block() {
    let mock = MockStream::new().block_when_drained();
    let mut client = pop3(&mock);

    assert!(client.top(1, 0).unwrap_err().is_would_block());
    mock.push_read(b"+OK\r\nSubject: one\r\n");
    assert!(client.top(1, 0).unwrap_err().is_would_block());
    mock.push_read(b"\r\n.\r\n");
    assert_eq!(client.top(1, 0).unwrap(), b"Subject: one\r\n\r\n");
    assert_eq!(mock.written_str(), "TOP 1 0\r\n");
}

#[test]
fn different_operation_in_flight_is_usage_error() {
    let mock = MockStream::new().block_when_drained();
    let mut client = pop3(&mock);

    assert!(client.stat().unwrap_err().is_would_block());
    let calls = mock.io_calls();
    assert!(matches!(client.list_all(), Err(Error::Usage(_))));
    assert_eq!(mock.io_calls(), calls);
}

#[test]
fn stls_requires_advertisement() {
    let mock = MockStream::new().read(b"+OK\r\nUSER\r\n.\r\n");
    let mut client = pop3(&mock);
    assert!(matches!(client.stls("pop.example.com"), Err(Error::NotSupported(_))));
    client.capa(false).unwrap();
    assert!(matches!(client.stls("pop.example.com"), Err(Error::NotSupported(_))));
    assert!(!client.session().is_latched());
}

#[test]
fn stls_handshake_failure_latches() {
    let mock = MockStream::new()
        .read(b"+OK\r\nSTLS\r\n.\r\n")
        .read(b"+OK begin TLS negotiation\r\n");
    let mut client = pop3(&mock);
    client.capa(false).unwrap();

    assert!(client.stls("pop.example.com").unwrap_err().is_fatal());
    assert!(client.session().is_latched());
    assert!(client.session().capabilities().is_none());
    assert!(matches!(client.noop(), Err(Error::Latched)));
}

#[test]
fn error_greeting_is_rejected() {
    let mock = MockStream::new().read(b"-ERR too many connections\r\n");
    let mut client = pop3(&mock);
    let err = client.open().unwrap_err();
    assert!(err.is_rejected());
    assert_eq!(client.last_reply().unwrap().text, "too many connections");
}

#[test]
fn line_breaks_in_credentials_are_refused() {
    let mock = MockStream::new().read(b"+OK ready\r\n");
    let mut client = pop3(&mock);
    assert!(matches!(client.user("alice\r\nDELE 1"), Err(Error::Usage(_))));
    assert!(client.session().is_idle());
    assert!(!client.session().is_latched());
    assert_eq!(mock.written(), b"");
    assert_eq!(client.open().unwrap(), "ready");
}

fn traced(mock: &MockStream) -> (Pop3<MockStream>, MemorySink) {
    let mut client = pop3(mock);
    let sink = MemorySink::new();
    client
        .session_mut()
        .enable_trace(sink.clone(), TraceMask::default())
        .unwrap();
    (client, sink)
}

fn assert_hidden(sink: &MemorySink) {
    for line in sink.lines() {
        assert!(!line.contains("secret"), "leaked into transcript: {line}");
    }
}

#[test]
fn retr_body_in_same_read_as_status_is_hidden() {
    let mock = MockStream::new()
        .read(b"+OK message follows\r\nSubject: secret plans\r\n\r\ntop secret body\r\n.\r\n");
    let (mut client, sink) = traced(&mock);

    let body = client.retr(1).unwrap();
    assert_eq!(body, b"Subject: secret plans\r\n\r\ntop secret body\r\n");
    assert_eq!(
        sink.lines(),
        vec!["C: RETR 1", "S: +OK message follows", "S: (data...)"]
    );
    assert_hidden(&sink);
}

#[test]
fn top_body_split_across_reads_is_hidden() {
    let mock = MockStream::new()
        .read(b"+OK top of message follows\r\nSubject: secret plans\r\n")
        .would_block()
        .read(b"\r\nsecret first line\r\n.\r\n")
        .read(b"+OK\r\n");
    let (mut client, sink) = traced(&mock);

    assert!(client.top(1, 1).unwrap_err().is_would_block());
    let body = client.top(1, 1).unwrap();
    assert_eq!(body, b"Subject: secret plans\r\n\r\nsecret first line\r\n");
    client.noop().unwrap();
    assert_eq!(
        sink.lines(),
        vec![
            "C: TOP 1 1",
            "S: +OK top of message follows",
            "S: (data...)",
            "C: NOOP",
            "S: +OK",
        ]
    );
    assert_hidden(&sink);
}
