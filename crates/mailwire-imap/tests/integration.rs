//! Integration tests for the IMAP client against a scripted mock carrier.

#![allow(clippy::unwrap_used)]

use mailwire_core::testing::MockStream;
use mailwire_core::{Carrier, Client, Error, MemorySink, SessionFlags, TraceMask};
use mailwire_imap::{
    FetchAttribute, FetchItem, FetchItems, Imap, MailboxAttribute, SequenceSet, StatusAttribute,
    StatusItem, Untagged,
};

fn imap(mock: &MockStream) -> Imap<MockStream> {
    Imap::new(Carrier::new(mock.clone()))
}

#[test]
fn login_list_status_logout() {
    let mock = MockStream::new()
        .read(b"* OK IMAP4rev1 ready\r\n")
        .read(b"A0001 OK LOGIN completed\r\n")
        .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
        .read(b"* LIST (\\HasChildren \\Noselect) \"/\" Archive\r\nA0002 OK LIST completed\r\n")
        .read(b"* STATUS INBOX (MESSAGES 3 UNSEEN 1)\r\nA0003 OK STATUS completed\r\n")
        .read(b"* BYE see you\r\nA0004 OK LOGOUT completed\r\n");
    let mut client = imap(&mock);

    assert_eq!(client.open().unwrap(), "IMAP4rev1 ready");
    client.login("alice", "hunter2").unwrap();
    assert!(client.session().flags().contains(SessionFlags::AUTH));

    let folders = client.list("", "*").unwrap();
    assert_eq!(folders.len(), 2);
    assert!(folders[0].mailbox.is_inbox());
    assert!(folders[1].attributes.contains(&MailboxAttribute::NoSelect));

    let items = client
        .status("INBOX", &[StatusAttribute::Messages, StatusAttribute::Unseen])
        .unwrap();
    assert_eq!(items, vec![StatusItem::Messages(3), StatusItem::Unseen(1)]);

    assert_eq!(client.logout().unwrap(), "see you");
    assert_eq!(
        mock.written_str(),
        "A0001 LOGIN alice hunter2\r\n\
         A0002 LIST \"\" *\r\n\
         A0003 STATUS INBOX (MESSAGES UNSEEN)\r\n\
         A0004 LOGOUT\r\n"
    );
}

#[test]
fn login_password_is_masked_in_transcript() {
    let mock = MockStream::new()
        .read(b"* OK ready\r\n")
        .read(b"A0001 OK done\r\n");
    let mut client = imap(&mock);
    let sink = MemorySink::new();
    client
        .session_mut()
        .enable_trace(sink.clone(), TraceMask::default())
        .unwrap();

    client.open().unwrap();
    client.login("alice", "hunter2").unwrap();
    assert_eq!(
        sink.lines(),
        vec![
            "S: * OK ready",
            "C: A0001 LOGIN alice \"***\"",
            "S: A0001 OK done",
        ]
    );
}

#[test]
fn capability_is_cached_and_replaced_by_login() {
    let mock = MockStream::new()
        .read(b"* OK ready\r\n")
        .read(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN\r\nA0001 OK done\r\n")
        .read(b"A0002 OK [CAPABILITY IMAP4rev1 IDLE] logged in\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();

    let caps = client.capability(false).unwrap();
    assert!(caps.contains("starttls"));
    assert_eq!(caps.value("AUTH"), Some("PLAIN"));

    let calls = mock.io_calls();
    assert_eq!(client.capability(false).unwrap().len(), 3);
    assert_eq!(mock.io_calls(), calls);

    client.login("alice", "hunter2").unwrap();
    let caps = client.session().capabilities().unwrap();
    assert!(caps.contains("IDLE"));
    assert!(!caps.contains("STARTTLS"));
}

#[test]
fn literal_with_crlf_resumes_across_would_block() {
    let mock = MockStream::new()
        .read(b"* PREAUTH hi\r\n")
        .read(b"A0001 OK [READ-WRITE] selected\r\n")
        .block_when_drained();
    let mut client = imap(&mock);
    client.open().unwrap();
    client.select("INBOX").unwrap();

    let set = SequenceSet::Single(1);
    let items = FetchItems::Items(vec![FetchAttribute::Rfc822]);

    assert!(client.fetch(&set, items.clone()).unwrap_err().is_would_block());
    mock.push_read(b"* 1 FETCH (RFC822 {12}\r\nSubj");
    assert!(client.fetch(&set, items.clone()).unwrap_err().is_would_block());
    assert!(client.session().flags().contains(SessionFlags::MULTILINE));
    mock.push_read(b"ect: x\r\n");
    assert!(client.fetch(&set, items.clone()).unwrap_err().is_would_block());
    mock.push_read(b")\r\nA0002 OK FETCH completed\r\n");

    let data = client.fetch(&set, items).unwrap();
    let Untagged::Fetch { seq: 1, items } = &data[0] else {
        panic!("expected FETCH for message 1");
    };
    assert_eq!(
        items[0],
        FetchItem::Body {
            section: None,
            origin: None,
            data: Some(b"Subject: x\r\n".to_vec()),
        }
    );
    assert!(!client.session().flags().contains(SessionFlags::MULTILINE));
    assert_eq!(
        mock.written_str(),
        "A0001 SELECT INBOX\r\nA0002 FETCH 1 RFC822\r\n"
    );
}

#[test]
fn different_operation_in_flight_is_usage_error() {
    let mock = MockStream::new().block_when_drained();
    let mut client = imap(&mock);

    assert!(client.noop().unwrap_err().is_would_block());
    let calls = mock.io_calls();
    assert!(matches!(client.capability(true), Err(Error::Usage(_))));
    assert_eq!(mock.io_calls(), calls);
}

#[test]
fn line_breaks_in_arguments_are_refused() {
    let mock = MockStream::new().read(b"* OK ready\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();

    assert!(matches!(
        client.login("alice", "pass\r\nA0002 LOGOUT"),
        Err(Error::Usage(_))
    ));
    assert!(!client.session().is_latched());
    assert_eq!(mock.written(), b"");
}

#[test]
fn starttls_requires_advertisement() {
    let mock = MockStream::new().read(b"* OK [CAPABILITY IMAP4rev1] hi\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();
    assert!(matches!(
        client.starttls("imap.example.com"),
        Err(Error::NotSupported(_))
    ));
    assert!(!client.session().is_latched());
}

#[test]
fn starttls_refuses_plaintext_after_reply() {
    let mock = MockStream::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS] hi\r\n")
        .read(b"A0001 OK begin TLS\r\n* OK injected\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();

    assert!(matches!(
        client.starttls("imap.example.com"),
        Err(Error::Protocol(_))
    ));
    assert!(client.session().is_latched());
    assert!(client.session().capabilities().is_none());
}

#[test]
fn starttls_handshake_failure_latches() {
    let mock = MockStream::new()
        .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS] hi\r\n")
        .read(b"A0001 OK begin TLS negotiation\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();

    assert!(client.starttls("imap.example.com").unwrap_err().is_fatal());
    assert!(client.session().is_latched());
    assert!(matches!(client.noop(), Err(Error::Latched)));
}

#[test]
fn rejected_command_keeps_session_usable() {
    let mock = MockStream::new()
        .read(b"* OK ready\r\n")
        .read(b"A0001 NO [AUTHENTICATIONFAILED] bad password\r\n")
        .read(b"A0002 OK done\r\n");
    let mut client = imap(&mock);
    client.open().unwrap();

    let err = client.login("alice", "wrong").unwrap_err();
    assert!(err.is_rejected());
    assert_eq!(client.last_reply().unwrap().text, "bad password");
    assert!(!client.session().flags().contains(SessionFlags::AUTH));

    client.login("alice", "right").unwrap();
    assert!(client.session().flags().contains(SessionFlags::AUTH));
}
