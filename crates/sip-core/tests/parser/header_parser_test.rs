// Header value parsers exercised through the public API

use sigcore_sip_core::parser::address::parse_name_addr;
use sigcore_sip_core::parser::cseq::parse_cseq;
use sigcore_sip_core::prelude::*;
use sigcore_sip_core::TransportKind;

#[test]
fn test_via_list_across_headers() {
    let msg = Message::parse(
        "SIP/2.0 200 OK\r\n\
         Via: SIP/2.0/UDP proxy.biloxi.com;branch=z9hG4bKnashds8;received=192.0.2.3, \
              SIP/2.0/TLS [2001:db8::9]:5061;branch=z9hG4bK77ef4c2312983.1\r\n\
         v: SIP/2.0/SCTP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
         To: Bob <sip:bob@biloxi.com>;tag=a6c85cf\r\n\
         From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
         Call-ID: a84b4c76e66710\r\n\
         CSeq: 314159 INVITE\r\n\r\n",
    )
    .unwrap();

    let vias = msg.vias().expect("Failed to parse Via entries");
    assert_eq!(vias.len(), 3);
    assert_eq!(vias[0], msg.via1);
    assert_eq!(vias[0].received.as_ref().unwrap(), "192.0.2.3");
    assert_eq!(vias[1].transport_kind, TransportKind::Tls);
    assert_eq!(vias[1].host_str(), "2001:db8::9");
    assert_eq!(vias[1].port, Some(5061));
    assert_eq!(vias[2].transport_kind, TransportKind::Sctp);
}

#[test]
fn test_legacy_branch_has_no_suffix() {
    let vias = parse_via_list(&Span::from_static("SIP/2.0/UDP 192.0.2.1;branch=1234")).unwrap();
    assert!(!vias[0].has_magic_cookie());
    assert!(vias[0].branch_suffix().is_none());
    assert_eq!(vias[0].param("branch").unwrap().value.as_ref().unwrap(), "1234");
}

#[test]
fn test_from_to_forms() {
    let from = parse_from_to(
        &Span::from_static("\"Mr. Watson\" <sip:watson@worcester.bell-telephone.com>;tag=32"),
        "From",
    )
    .unwrap();
    assert_eq!(from.name_addr.display.as_ref().unwrap(), "\"Mr. Watson\"");
    assert_eq!(from.uri().user.as_ref().unwrap(), "watson");
    assert_eq!(from.tag_str(), Some("32"));

    // a bare addr-spec leaves the parameters to the header
    let to = parse_from_to(&Span::from_static("sip:bob@biloxi.com;tag=9fxced76sl"), "To").unwrap();
    assert!(to.name_addr.display.is_none());
    assert!(to.uri().params.is_empty());
    assert_eq!(to.tag_str(), Some("9fxced76sl"));

    let unquoted = parse_from_to(&Span::from_static("Bob Smith<sip:bob@biloxi.com>"), "To").unwrap();
    assert_eq!(unquoted.name_addr.display.as_ref().unwrap(), "Bob Smith");
    assert!(unquoted.tag.is_none());
}

#[test]
fn test_malformed_addresses() {
    for bad in ["", "<sip:bob@biloxi.com", "\"unterminated <sip:a@b.com>", "<>"] {
        assert!(
            matches!(
                parse_name_addr(&Span::from_static(bad), "Contact"),
                Err(ParseError::MalformedHeaderValue { header: "Contact", .. })
            ),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn test_contact_list_with_commas_in_display() {
    let contacts = parse_name_addr_list(
        &Span::from_static(
            "\"Watson, Jr.\" <sip:watson@192.0.2.7>;q=0.7, <sip:watson@bell.example.com>;expires=60",
        ),
        "Contact",
    )
    .unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].display.as_ref().unwrap(), "\"Watson, Jr.\"");
    assert_eq!(contacts[0].param("q").unwrap().value.as_ref().unwrap(), "0.7");
    assert_eq!(contacts[1].uri.host, "bell.example.com");
    assert_eq!(contacts[1].to_string(), "<sip:watson@bell.example.com>;expires=60");
}

#[test]
fn test_route_set_concatenates_headers() {
    let msg = Message::parse(
        "BYE sip:bob@192.0.2.4 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.1;branch=z9hG4bKr\r\n\
         Route: <sip:p1.example.com;lr>, <sip:p2.example.com;lr>\r\n\
         Route: <sip:p3.example.com;lr>\r\n\
         To: <sip:bob@biloxi.com>;tag=b\r\n\
         From: <sip:alice@atlanta.com>;tag=a\r\n\
         Call-ID: r\r\n\
         CSeq: 3 BYE\r\n\r\n",
    )
    .unwrap();

    let routes = msg.route_set().unwrap();
    let hosts: Vec<&str> = routes.iter().map(|r| r.uri.host.as_str()).collect();
    assert_eq!(hosts, ["p1.example.com", "p2.example.com", "p3.example.com"]);
    assert!(routes.iter().all(|r| r.uri.is_loose_router()));
    assert!(msg.record_route_set().unwrap().is_empty());

    assert!(parse_name_addr_list(&Span::from_static("<sip:a@b.com>,,<sip:c@d.com>"), "Route").is_err());
}

#[test]
fn test_cseq_values() {
    let cseq = parse_cseq(&Span::from_static("4711 INVITE")).unwrap();
    assert_eq!(cseq.num, 4711);
    assert_eq!(cseq.num_str, "4711");
    assert_eq!(cseq.method, Method::Invite);

    let cseq = parse_cseq(&Span::from_static("007\r\n NOTIFY ")).unwrap();
    assert_eq!(cseq.num, 7);
    assert_eq!(cseq.num_str, "007");
    assert_eq!(cseq.method_str, "NOTIFY");

    for bad in ["INVITE", "1", "1INVITE", "4294967296 INVITE", "1 INVITE extra"] {
        assert!(parse_cseq(&Span::from_static(bad)).is_err(), "{bad:?} should be rejected");
    }
}
