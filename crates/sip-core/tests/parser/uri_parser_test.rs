// URI parser tests

use std::str::FromStr;

use sigcore_sip_core::prelude::*;
use sigcore_sip_core::Scheme;

#[test]
fn test_parse_sip_uri() {
    let uri = SipUri::from_str("sip:user@example.com").expect("Failed to parse basic SIP URI");
    assert_eq!(uri.scheme, Scheme::Sip, "URI scheme should be SIP");
    assert_eq!(uri.user.as_ref().unwrap(), "user");
    assert_eq!(uri.host, "example.com");
    assert_eq!(uri.port, None, "Port should be absent");
    assert_eq!(uri.port_or_default(), 5060);
    assert!(uri.params.is_empty(), "URI should have no parameters");
    assert!(uri.headers.is_empty(), "URI should have no headers");

    let uri = SipUri::from_str("sip:user@example.com:5080").expect("Failed to parse URI with port");
    assert_eq!(uri.port, Some(5080));

    let uri = SipUri::from_str("sip:user@example.com;transport=tcp;ttl=5")
        .expect("Failed to parse URI with parameters");
    assert_eq!(uri.params.len(), 2);
    assert_eq!(uri.transport().unwrap(), "tcp");
    assert_eq!(uri.param("ttl").unwrap().value.as_ref().unwrap(), "5");

    let uri = SipUri::from_str("sip:example.com").expect("Failed to parse URI without user part");
    assert!(uri.user.is_none());
    assert_eq!(uri.host, "example.com");
}

#[test]
fn test_uri_with_headers() {
    let uri = SipUri::from_str("sip:user@example.com?subject=Meeting&priority=urgent")
        .expect("Failed to parse URI with headers");
    assert_eq!(uri.headers.len(), 2, "URI should have 2 headers");
    assert_eq!(uri.headers[0].name, "subject");
    assert_eq!(uri.headers[0].value.as_ref().unwrap(), "Meeting");
    assert_eq!(uri.headers[1].value.as_ref().unwrap(), "urgent");
}

#[test]
fn test_sips_ipv4_and_ipv6() {
    let uri = SipUri::from_str("sips:alice@192.0.2.1:5061").unwrap();
    assert_eq!(uri.scheme, Scheme::Sips);
    assert_eq!(uri.host_str(), "192.0.2.1");

    let uri = SipUri::from_str("sip:[2001:db8::1];lr").unwrap();
    assert_eq!(uri.host_str(), "2001:db8::1");
    assert!(uri.is_loose_router());
}

#[test]
fn test_user_with_password_and_escapes() {
    let uri = SipUri::from_str("sip:alice%20smith:pw@atlanta.com").unwrap();
    assert_eq!(uri.user.as_ref().unwrap(), "alice%20smith");
    assert_eq!(uri.password.as_ref().unwrap(), "pw");
}

#[test]
fn test_telephone_user_with_params() {
    let uri = SipUri::from_str("sip:+1-212-555-1212:1234@gateway.com;user=phone").unwrap();
    assert_eq!(uri.user.as_ref().unwrap(), "+1-212-555-1212");
    assert_eq!(uri.password.as_ref().unwrap(), "1234");
    assert_eq!(uri.param("user").unwrap().value.as_ref().unwrap(), "phone");
}

#[test]
fn test_other_schemes() {
    let uri = SipUri::from_str("mailto:alice@atlanta.com").unwrap();
    assert_eq!(uri.scheme, Scheme::Other);
    assert_eq!(uri.scheme_str, "mailto");
    assert!(!uri.is_sip());
    assert_eq!(uri.to_string(), "mailto:alice@atlanta.com");
}

#[test]
fn test_invalid_uris() {
    for bad in ["", "example.com", "sip:", "sip:user@", "sip:host:port", "sip:[::1"] {
        assert!(
            matches!(SipUri::from_str(bad), Err(ParseError::MalformedUri(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn test_display_is_verbatim() {
    let text = "sip:Bob@Biloxi.COM:5060;Transport=UDP;lr";
    assert_eq!(SipUri::from_str(text).unwrap().to_string(), text);
}
