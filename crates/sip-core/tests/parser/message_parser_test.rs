// Whole-message parsing, including the RFC 4475 style oddities the
// scanner has to tolerate

use sigcore_sip_core::prelude::*;
use sigcore_sip_core::TransportKind;

#[test]
fn test_parse_rfc3261_invite() {
    let msg = Message::parse(
        "INVITE sip:bob@biloxi.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
         Max-Forwards: 70\r\n\
         To: Bob <sip:bob@biloxi.com>\r\n\
         From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
         Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
         CSeq: 314159 INVITE\r\n\
         Contact: <sip:alice@pc33.atlanta.com>\r\n\
         Content-Type: application/sdp\r\n\
         Content-Length: 8\r\n\
         \r\n\
         v=0\r\no=x",
    )
    .expect("Failed to parse INVITE");

    assert!(msg.is_request());
    assert_eq!(msg.method(), &Method::Invite);
    assert_eq!(msg.request_uri().unwrap().user.as_ref().unwrap(), "bob");
    assert_eq!(msg.headers.len(), 9);
    assert_eq!(msg.via1.transport_kind, TransportKind::Udp);
    assert!(msg.via1.has_magic_cookie());
    assert_eq!(msg.from.name_addr.display.as_ref().unwrap(), "Alice");
    assert_eq!(msg.to.uri().host, "biloxi.com");
    assert_eq!(&msg.body[..], b"v=0\r\no=x");
}

#[test]
fn test_compact_headers() {
    let msg = Message::parse(
        "BYE sip:bob@192.0.2.4 SIP/2.0\r\n\
         v: SIP/2.0/UDP 192.0.2.1;branch=z9hG4bKbye\r\n\
         t: <sip:bob@biloxi.com>;tag=b\r\n\
         f: <sip:alice@atlanta.com>;tag=a\r\n\
         i: compact-call\r\n\
         CSeq: 2 BYE\r\n\
         l: 0\r\n\r\n",
    )
    .expect("Failed to parse compact headers");

    assert_eq!(msg.call_id, "compact-call");
    assert_eq!(msg.to.tag_str(), Some("b"));
    assert_eq!(msg.content_length, Some(0));
    assert!(msg.header("Call-ID").is_some());
    assert!(msg.header("Via").is_some());
}

#[test]
fn test_bare_lf_and_folded_via() {
    let msg = Message::parse(
        "SIP/2.0 200 OK\n\
         Via: SIP/2.0/UDP\n  192.0.2.1:5070\n\t;branch=z9hG4bKfold\n\
         To: <sip:bob@biloxi.com>;tag=b\n\
         From: <sip:alice@atlanta.com>;tag=a\n\
         Call-ID: fold\n\
         CSeq: 1 OPTIONS\n\n",
    )
    .expect("Failed to parse folded message");

    assert_eq!(msg.status(), Some(200));
    assert_eq!(msg.reason().unwrap(), "OK");
    assert_eq!(msg.via1.port, Some(5070));
    assert_eq!(msg.via1.branch.as_ref().unwrap(), "z9hG4bKfold");
    assert_eq!(msg.method(), &Method::Options);
}

#[test]
fn test_extension_method_and_unknown_headers() {
    let msg = Message::parse(
        "SUBSCRIBE sip:presence@example.com SIP/2.0\r\n\
         Via: SIP/2.0/TCP 192.0.2.1;branch=z9hG4bKsub\r\n\
         To: <sip:presence@example.com>\r\n\
         From: <sip:alice@atlanta.com>;tag=a\r\n\
         Call-ID: sub-1\r\n\
         CSeq: 1 SUBSCRIBE\r\n\
         Event: presence\r\n\
         X-Empty:\r\n\r\n",
    )
    .expect("Failed to parse SUBSCRIBE");

    assert_eq!(msg.method(), &Method::Other("SUBSCRIBE".to_string()));
    assert_eq!(msg.via1.transport_kind, TransportKind::Tcp);
    assert_eq!(msg.header("event").unwrap().value, "presence");
    assert!(msg.header("X-Empty").unwrap().value.is_empty());
    assert_eq!(msg.headers_of(HeaderKind::Other).count(), 2);
    assert!(msg.content_length.is_none());
}

#[test]
fn test_mandatory_header_errors() {
    let base = "OPTIONS sip:a@192.0.2.1 SIP/2.0\r\n\
                Via: SIP/2.0/UDP 192.0.2.2;branch=z9hG4bKx\r\n\
                To: <sip:a@192.0.2.1>\r\n\
                From: <sip:b@192.0.2.2>;tag=1\r\n\
                Call-ID: c\r\n\
                CSeq: 1 OPTIONS\r\n\r\n";
    assert!(Message::parse(base).is_ok());

    let broken_via = base.replace("SIP/2.0/UDP 192.0.2.2", "SIP/2.0/UDP");
    assert!(matches!(
        Message::parse(broken_via),
        Err(ParseError::MalformedHeaderValue { header: "Via", .. })
    ));

    let broken_cseq = base.replace("CSeq: 1 OPTIONS", "CSeq: 1");
    assert!(matches!(
        Message::parse(broken_cseq),
        Err(ParseError::MalformedHeaderValue { header: "CSeq", .. })
    ));

    let broken_to = base.replace("To: <sip:a@192.0.2.1>", "To: <sip:a@192.0.2.1");
    assert!(matches!(
        Message::parse(broken_to),
        Err(ParseError::MalformedHeaderValue { header: "To", .. })
    ));

    let no_call_id = base.replace("Call-ID: c\r\n", "");
    assert_eq!(
        Message::parse(no_call_id).err(),
        Some(ParseError::MissingMandatoryHeader("Call-ID"))
    );
}

#[test]
fn test_body_is_binary_and_truncated() {
    let mut buf = b"MESSAGE sip:a@192.0.2.1 SIP/2.0\r\n\
                    Via: SIP/2.0/UDP 192.0.2.2;branch=z9hG4bKm\r\n\
                    To: <sip:a@192.0.2.1>\r\n\
                    From: <sip:b@192.0.2.2>;tag=1\r\n\
                    Call-ID: m\r\n\
                    CSeq: 1 MESSAGE\r\n\
                    Content-Length: 3\r\n\r\n"
        .to_vec();
    buf.extend_from_slice(&[0xff, 0x00, 0xfe, 0x01, 0x02]);

    let msg = Message::parse(buf).expect("Binary body should parse");
    assert_eq!(&msg.body[..], &[0xff, 0x00, 0xfe]);
}

#[test]
fn test_latin1_display_name_is_kept_verbatim() {
    let mut buf = b"OPTIONS sip:a@192.0.2.1 SIP/2.0\r\n\
        Via: SIP/2.0/UDP 192.0.2.2;branch=z9hG4bKl1\r\n\
        From: \"Jos".to_vec();
    buf.push(0xe9);
    buf.extend_from_slice(
        b"\" <sip:jose@192.0.2.2>;tag=l1\r\n\
          To: <sip:a@192.0.2.1>\r\n\
          Call-ID: latin1\r\n\
          CSeq: 1 OPTIONS\r\n\
          Subject: caf",
    );
    buf.push(0xe9);
    buf.extend_from_slice(b"\r\n\r\n");

    let msg = Message::parse(buf.clone()).expect("Latin-1 octets in values should parse");
    let display = msg.from.name_addr.display.as_ref().unwrap();
    assert_eq!(display.as_bytes(), b"\"Jos\xe9\"");
    assert_eq!(msg.from.tag_str(), Some("l1"));
    assert_eq!(msg.header("Subject").unwrap().value.as_bytes(), b"caf\xe9");
    assert_eq!(&msg.to_bytes()[..], &buf[..]);
}

#[test]
fn test_non_token_header_name_is_rejected() {
    let mut buf = b"OPTIONS sip:a@192.0.2.1 SIP/2.0\r\nSubj".to_vec();
    buf.push(0xe9);
    buf.extend_from_slice(b": x\r\n\r\n");
    assert!(matches!(
        RawMessage::scan(buf),
        Err(ParseError::MalformedHeaderValue { .. })
    ));
}

#[test]
fn test_addresses_recorded() {
    let msg = Message::parse(
        "SIP/2.0 100 Trying\r\n\
         Via: SIP/2.0/UDP 192.0.2.1;branch=z9hG4bKt\r\n\
         To: <sip:bob@biloxi.com>\r\n\
         From: <sip:alice@atlanta.com>;tag=a\r\n\
         Call-ID: t\r\n\
         CSeq: 1 INVITE\r\n\r\n",
    )
    .unwrap()
    .with_addresses(
        "192.0.2.4:5060".parse().unwrap(),
        "192.0.2.1:5060".parse().unwrap(),
    );

    assert_eq!(msg.source.unwrap().port(), 5060);
    assert_eq!(msg.local.unwrap().ip().to_string(), "192.0.2.1");
    assert_eq!(msg.method(), &Method::Invite);
}
