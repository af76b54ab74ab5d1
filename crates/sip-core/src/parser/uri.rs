//! URI parser (RFC 3261 Section 19.1.1, 25.1).
//!
//! ```text
//! SIP-URI  = "sip:" [ userinfo ] hostport uri-parameters [ headers ]
//! userinfo = user [ ":" password ] "@"
//! hostport = host [ ":" port ]
//! headers  = "?" header *( "&" header )
//! ```

use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::digit1;
use nom::combinator::opt;
use nom::sequence::preceded;

use super::params::parse_params;
use super::{fail, ParseResult};
use crate::error::{ParseError, Result};
use crate::span::{is_lws, Span};
use crate::types::{Scheme, SipUri, UriHeader};

fn is_scheme_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'+' | b'-' | b'.')
}

fn is_host_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'.' | b'_')
}

fn is_uri_header_char(c: u8) -> bool {
    !is_lws(c) && !matches!(c, b'&' | b'=' | b'>' | b'<' | b'"' | b';' | b',')
}

fn is_opaque_char(c: u8) -> bool {
    !is_lws(c) && !matches!(c, b'>' | b'<' | b'"')
}

/// host = hostname / IPv4address / "[" IPv6address "]"
pub fn host(input: &[u8]) -> ParseResult<&[u8]> {
    if input.first() == Some(&b'[') {
        match input.iter().position(|c| *c == b']') {
            Some(end) if end > 1 => Ok((&input[end + 1..], &input[..end + 1])),
            _ => fail(input),
        }
    } else {
        take_while1(is_host_char)(input)
    }
}

/// `":" port`, returning the digits. Port 0 is reported as absent.
pub fn port(input: &[u8]) -> ParseResult<(&[u8], Option<u16>)> {
    let (rem, digits) = preceded(tag(b":"), digit1)(input)?;
    let Some(port) = std::str::from_utf8(digits)
        .ok()
        .and_then(|d| d.parse::<u16>().ok())
    else {
        return fail(input);
    };
    Ok((rem, (digits, (port != 0).then_some(port))))
}

/// Locates the `@` ending the userinfo, if any, before the URI's delimiters
fn userinfo_end(input: &[u8]) -> Option<usize> {
    input
        .iter()
        .take_while(|c| !is_lws(**c) && **c != b'>')
        .position(|c| *c == b'@')
}

fn uri_headers<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, Vec<UriHeader>> {
    let mut headers = Vec::new();
    let Ok((mut rest, _)) = tag::<_, _, nom::error::Error<&[u8]>>(b"?")(input) else {
        return Ok((input, headers));
    };
    loop {
        let (rem, name) = take_while1(is_uri_header_char)(rest)?;
        let (rem, value) = opt(preceded(tag(b"="), take_while(is_uri_header_char)))(rem)?;
        headers.push(UriHeader {
            name: src.sub(name),
            value: value.map(|v| src.sub(v)),
        });
        match tag::<_, _, nom::error::Error<&[u8]>>(b"&")(rem) {
            Ok((next, _)) => rest = next,
            Err(_) => return Ok((rem, headers)),
        }
    }
}

/// Parses a URI at the start of `input`, a sub-slice of `src`
pub fn uri<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, SipUri> {
    let (rem, scheme_str) = take_while1(is_scheme_char)(input)?;
    if !scheme_str[0].is_ascii_alphabetic() {
        return fail(input);
    }
    let (rem, _) = tag(b":")(rem)?;

    let scheme = if scheme_str.eq_ignore_ascii_case(b"sip") {
        Scheme::Sip
    } else if scheme_str.eq_ignore_ascii_case(b"sips") {
        Scheme::Sips
    } else {
        Scheme::Other
    };

    if scheme == Scheme::Other {
        let (rest, opaque) = take_while1(is_opaque_char)(rem)?;
        let raw = &input[..input.len() - rest.len()];
        return Ok((
            rest,
            SipUri {
                scheme,
                scheme_str: src.sub(scheme_str),
                user: None,
                password: None,
                host: Span::default(),
                port: None,
                port_str: None,
                params: Vec::new(),
                headers: Vec::new(),
                opaque: Some(src.sub(opaque)),
                raw: src.sub(raw),
            },
        ));
    }

    let (rem, user, password) = match userinfo_end(rem) {
        Some(at) => {
            let userinfo = &rem[..at];
            let (user, password) = match userinfo.iter().position(|c| *c == b':') {
                Some(colon) => (&userinfo[..colon], Some(&userinfo[colon + 1..])),
                None => (userinfo, None),
            };
            (
                &rem[at + 1..],
                Some(src.sub(user)),
                password.map(|p| src.sub(p)),
            )
        }
        None => (rem, None, None),
    };

    let (rem, host_str) = host(rem)?;
    let (rem, port) = opt(port)(rem)?;
    let (rem, params) = parse_params(src, rem)?;
    let (rest, headers) = uri_headers(src, rem)?;

    let raw = &input[..input.len() - rest.len()];
    Ok((
        rest,
        SipUri {
            scheme,
            scheme_str: src.sub(scheme_str),
            user,
            password,
            host: src.sub(host_str),
            port: port.and_then(|(_, p)| p),
            port_str: port.map(|(digits, _)| src.sub(digits)),
            params,
            headers,
            opaque: None,
            raw: src.sub(raw),
        },
    ))
}

/// Parses `span` as one complete URI
pub fn parse_uri(span: &Span) -> Result<SipUri> {
    match uri(span, span.as_bytes()) {
        Ok((rest, parsed)) if rest.is_empty() => Ok(parsed),
        _ => Err(ParseError::MalformedUri(span.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sip_uri() {
        let uri = parse_uri(&Span::from_static(
            "sip:alice:secret@atlanta.com:5070;transport=tcp;lr?subject=project&priority=urgent",
        ))
        .unwrap();
        assert_eq!(uri.scheme, Scheme::Sip);
        assert_eq!(uri.user.as_ref().unwrap(), "alice");
        assert_eq!(uri.password.as_ref().unwrap(), "secret");
        assert_eq!(uri.host, "atlanta.com");
        assert_eq!(uri.port, Some(5070));
        assert_eq!(uri.port_str.as_ref().unwrap(), "5070");
        assert_eq!(uri.transport().unwrap(), "tcp");
        assert!(uri.is_loose_router());
        assert_eq!(uri.headers.len(), 2);
        assert_eq!(uri.headers[1].name, "priority");
        assert_eq!(uri.headers[1].value.as_ref().unwrap(), "urgent");
    }

    #[test]
    fn test_ipv6_host() {
        let uri = parse_uri(&Span::from_static("sips:[2001:db8::10]:5061")).unwrap();
        assert_eq!(uri.scheme, Scheme::Sips);
        assert_eq!(uri.host, "[2001:db8::10]");
        assert_eq!(uri.host_str(), "2001:db8::10");
        assert_eq!(uri.port, Some(5061));
    }

    #[test]
    fn test_zero_port_is_absent() {
        let uri = parse_uri(&Span::from_static("sip:host:0")).unwrap();
        assert_eq!(uri.port, None);
        assert_eq!(uri.port_or_default(), 5060);
    }

    #[test]
    fn test_other_scheme_is_opaque() {
        let uri = parse_uri(&Span::from_static("tel:+1-201-555-0123;phone-context=x")).unwrap();
        assert_eq!(uri.scheme, Scheme::Other);
        assert_eq!(uri.scheme_str, "tel");
        assert_eq!(uri.opaque.as_ref().unwrap(), "+1-201-555-0123;phone-context=x");
        assert!(!uri.is_sip());
    }

    #[test]
    fn test_invalid_uris() {
        for bad in ["", "sip:", "sip:@", "sip:host:99999", "1sip:host", "sip:host junk"] {
            assert!(
                parse_uri(&Span::from_static(bad)).is_err(),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_prefix_parse_stops_at_angle_bracket() {
        let src = Span::from_static("sip:bob@biloxi.com>;tag=1");
        let (rest, uri) = super::uri(&src, src.as_bytes()).unwrap();
        assert_eq!(rest, b">;tag=1");
        assert_eq!(uri.to_string(), "sip:bob@biloxi.com");
    }
}
