//! name-addr / addr-spec parsing for From, To, Contact, Route and
//! Record-Route (RFC 3261 Section 20.10, 25.1).
//!
//! ```text
//! name-addr    = [ display-name ] LAQUOT addr-spec RAQUOT
//! display-name = *(token LWS) / quoted-string
//! from-spec    = ( name-addr / addr-spec ) *( SEMI from-param )
//! ```
//!
//! The address itself is located with a small state machine: the display
//! name may be a run of tokens or a quoted-string, and an address without
//! angle brackets ends at the first `;`, which then starts the header
//! parameters.

use std::ops::Range;

use super::params::parse_params;
use super::uri::uri;
use super::whitespace::sws;
use super::{fail, offset_of, ParseResult};
use crate::error::{ParseError, Result};
use crate::span::{is_lws, Span};
use crate::types::{find_param, Contacts, FromTo, NameAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sws,
    MaybeUri,
    MaybeUriEnd,
    Disp,
    DispQuoted,
    DispLaquot,
    Uri,
}

struct Located {
    consumed: usize,
    display: Option<Range<usize>>,
    addr: Range<usize>,
}

fn locate(input: &[u8]) -> Option<Located> {
    let mut state = State::Sws;
    let mut beg = 0;
    let mut uri_end = 0;
    let mut display = None;

    let mut i = 0;
    while i < input.len() {
        let c = input[i];
        match state {
            State::Sws => match c {
                b'"' => {
                    state = State::DispQuoted;
                    beg = i;
                }
                b'<' => {
                    state = State::Uri;
                    beg = i + 1;
                }
                c if is_lws(c) => {}
                _ => {
                    state = State::MaybeUri;
                    beg = i;
                }
            },
            State::MaybeUri => match c {
                c if is_lws(c) => {
                    state = State::MaybeUriEnd;
                    uri_end = i;
                }
                b'<' => {
                    display = Some(beg..i);
                    state = State::Uri;
                    beg = i + 1;
                }
                b';' => {
                    return Some(Located {
                        consumed: i,
                        display: None,
                        addr: beg..i,
                    })
                }
                _ => {}
            },
            State::MaybeUriEnd => match c {
                b';' => {
                    return Some(Located {
                        consumed: i,
                        display: None,
                        addr: beg..uri_end,
                    })
                }
                b'<' => {
                    display = Some(beg..uri_end);
                    state = State::Uri;
                    beg = i + 1;
                }
                c if is_lws(c) => {}
                _ => state = State::Disp,
            },
            State::Disp => match c {
                b'"' => {
                    state = State::DispQuoted;
                    beg = i;
                }
                b'<' => {
                    display = Some(beg..i);
                    state = State::Uri;
                    beg = i + 1;
                }
                _ => {}
            },
            State::DispQuoted => match c {
                b'"' => {
                    display = Some(beg..i + 1);
                    state = State::DispLaquot;
                }
                b'\\' => {
                    i += 1;
                    if i >= input.len() {
                        return None;
                    }
                }
                _ => {}
            },
            State::DispLaquot => match c {
                b'<' => {
                    state = State::Uri;
                    beg = i + 1;
                }
                c if is_lws(c) => {}
                _ => return None,
            },
            State::Uri => {
                if c == b'>' {
                    return Some(Located {
                        consumed: i + 1,
                        display,
                        addr: beg..i,
                    });
                }
            }
        }
        i += 1;
    }

    match state {
        State::MaybeUri => Some(Located {
            consumed: input.len(),
            display: None,
            addr: beg..input.len(),
        }),
        State::MaybeUriEnd => Some(Located {
            consumed: input.len(),
            display: None,
            addr: beg..uri_end,
        }),
        _ => None,
    }
}

/// Parses a name-addr or addr-spec with its trailing parameters
pub fn name_addr<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, NameAddr> {
    let Some(located) = locate(input) else {
        return fail(input);
    };

    let addr = src.sub(&input[located.addr]).trim();
    let parsed = match uri(src, addr.as_bytes()) {
        Ok((rest, parsed)) if rest.is_empty() => parsed,
        _ => return fail(input),
    };

    let display = located
        .display
        .map(|r| src.sub(&input[r]).trim())
        .filter(|d| !d.is_empty());

    let (rem, params) = parse_params(src, &input[located.consumed..])?;
    let (rem, _) = sws(rem)?;

    Ok((
        rem,
        NameAddr {
            display,
            addr,
            uri: parsed,
            params,
        },
    ))
}

/// Parses a whole header value holding exactly one address
pub fn parse_name_addr(value: &Span, header: &'static str) -> Result<NameAddr> {
    match name_addr(value, value.as_bytes()) {
        Ok((rest, na)) if rest.is_empty() => Ok(na),
        Ok((rest, _)) => Err(ParseError::header(
            header,
            format!(
                "trailing characters at offset {}",
                offset_of(value.as_bytes(), rest)
            ),
        )),
        Err(_) => Err(ParseError::header(header, "invalid name-addr")),
    }
}

/// Parses a From or To header value, extracting the `tag` parameter
pub fn parse_from_to(value: &Span, header: &'static str) -> Result<FromTo> {
    let name_addr = parse_name_addr(value, header)?;
    let tag = find_param(&name_addr.params, "tag").and_then(|p| p.value.clone());
    Ok(FromTo { name_addr, tag })
}

/// Splits a header value on commas outside quotes and angle brackets
pub fn split_list(value: &Span) -> Vec<Span> {
    let bytes = value.as_bytes();
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, &c) in bytes.iter().enumerate() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            b'"' => in_quotes = true,
            b'<' => in_angle = true,
            b'>' => in_angle = false,
            b',' if !in_angle => {
                parts.push(value.slice(start..i).trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(value.slice(start..bytes.len()).trim());
    parts
}

/// Parses a comma-separated list of addresses (Contact, Route, Record-Route)
pub fn parse_name_addr_list(value: &Span, header: &'static str) -> Result<Vec<NameAddr>> {
    split_list(value)
        .iter()
        .map(|part| {
            if part.is_empty() {
                Err(ParseError::header(header, "empty list element"))
            } else {
                parse_name_addr(part, header)
            }
        })
        .collect()
}

/// Parses a Contact header value, either `*` or a list of addresses
pub fn parse_contacts(value: &Span) -> Result<Contacts> {
    if value.trim() == "*" {
        return Ok(Contacts::Wildcard);
    }
    parse_name_addr_list(value, "Contact").map(Contacts::List)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_to(s: &'static str) -> FromTo {
        parse_from_to(&Span::from_static(s), "From").unwrap()
    }

    #[test]
    fn test_quoted_display_name() {
        let ft = from_to(r#""Bob \"B\" Smith" <sip:bob@biloxi.com>;tag=a6c85cf"#);
        let na = &ft.name_addr;
        assert_eq!(na.display.as_ref().unwrap(), r#""Bob \"B\" Smith""#);
        assert_eq!(na.addr, "sip:bob@biloxi.com");
        assert_eq!(na.uri.host, "biloxi.com");
        assert_eq!(ft.tag.as_ref().unwrap(), "a6c85cf");
    }

    #[test]
    fn test_token_display_name() {
        let ft = from_to("Alice Liddell <sip:alice@atlanta.com>");
        assert_eq!(ft.name_addr.display.as_ref().unwrap(), "Alice Liddell");
        assert!(ft.tag.is_none());
    }

    #[test]
    fn test_bare_addr_spec_params_belong_to_header() {
        let ft = from_to("sip:carol@chicago.com;tag=887s");
        assert!(ft.name_addr.display.is_none());
        assert_eq!(ft.name_addr.addr, "sip:carol@chicago.com");
        assert!(ft.name_addr.uri.params.is_empty());
        assert_eq!(ft.tag_str(), Some("887s"));
    }

    #[test]
    fn test_uri_params_inside_brackets() {
        let ft = from_to("<sip:carol@chicago.com;transport=tcp>;tag=1");
        assert_eq!(ft.uri().transport().unwrap(), "tcp");
        assert_eq!(ft.tag_str(), Some("1"));
    }

    #[test]
    fn test_folded_whitespace_before_bracket() {
        let ft = from_to("Bob\r\n <sip:bob@biloxi.com> ; tag = x");
        assert_eq!(ft.name_addr.display.as_ref().unwrap(), "Bob");
        assert_eq!(ft.tag_str(), Some("x"));
    }

    #[test]
    fn test_malformed_name_addrs() {
        for bad in [
            "",
            "<sip:bob@biloxi.com",
            r#""unterminated <sip:a@b>"#,
            r#""Bob" x <sip:a@b>"#,
            "<not a uri>",
            "<sip:a@b> junk",
        ] {
            assert!(
                parse_from_to(&Span::from_static(bad), "To").is_err(),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_route_list() {
        let value = Span::from_static(
            r#"<sip:p1.example.com;lr>, "a,b" <sip:p2.example.com;lr>,<sip:p3.example.com>"#,
        );
        let routes = parse_name_addr_list(&value, "Route").unwrap();
        assert_eq!(routes.len(), 3);
        assert!(routes[0].uri.is_loose_router());
        assert_eq!(routes[1].display.as_ref().unwrap(), r#""a,b""#);
        assert_eq!(routes[1].uri.host, "p2.example.com");
        assert!(!routes[2].uri.is_loose_router());

        assert!(parse_name_addr_list(&Span::from_static("<sip:a@b>,,<sip:c@d>"), "Route").is_err());
    }

    #[test]
    fn test_name_addr_leaves_remainder() {
        let src = Span::from_static("<sip:bob@biloxi.com;lr>;expires=60");
        let (rest, na) = name_addr(&src, src.as_bytes()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(na.addr, "sip:bob@biloxi.com;lr");
        assert!(na.uri.is_loose_router());
        assert_eq!(na.param("expires").unwrap().value.as_ref().unwrap(), "60");

        let bad = Span::from_static("<sip:bob@biloxi.com x>");
        assert!(name_addr(&bad, bad.as_bytes()).is_err());
        let bad = Span::from_static("<:nothing>");
        assert!(name_addr(&bad, bad.as_bytes()).is_err());
    }

    #[test]
    fn test_wildcard_contact() {
        let contacts = parse_contacts(&Span::from_static(" * ")).unwrap();
        assert!(contacts.is_wildcard());
        assert!(contacts.addresses().is_empty());

        let contacts =
            parse_contacts(&Span::from_static("<sip:a@pc33.atlanta.com>;expires=0, sip:b@c")).unwrap();
        assert!(!contacts.is_wildcard());
        assert_eq!(contacts.addresses().len(), 2);

        assert!(parse_contacts(&Span::from_static("*, <sip:a@b>")).is_err());
    }
}
