//! Via header parser (RFC 3261 Section 20.42).
//!
//! ```text
//! Via           = ( "Via" / "v" ) HCOLON via-parm *(COMMA via-parm)
//! via-parm      = sent-protocol LWS sent-by *( SEMI via-params )
//! sent-protocol = protocol-name SLASH protocol-version SLASH transport
//! sent-by       = host [ COLON port ]
//! ```

use nom::combinator::opt;

use super::params::param;
use super::separators::{comma, semi, slash, token};
use super::uri::{host, port};
use super::whitespace::{lws, sws};
use super::{fail, offset_of, ParseResult};
use crate::error::{ParseError, Result};
use crate::span::Span;
use crate::types::{TransportKind, Via};

/// Parses one via-parm at the start of `input`, a sub-slice of `src`
pub fn via_parm<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, Via> {
    let (rem, _) = sws(input)?;
    let (rem, name) = token(rem)?;
    if !name.eq_ignore_ascii_case(b"SIP") {
        return fail(rem);
    }
    let (rem, _) = slash(rem)?;
    let (rem, version) = token(rem)?;
    if version != b"2.0" {
        return fail(rem);
    }
    let (rem, _) = slash(rem)?;
    let (rem, transport) = token(rem)?;
    let (rem, _) = lws(rem)?;
    let (rem, host_str) = host(rem)?;
    let (mut rest, sent_by_port) = opt(port)(rem)?;

    let mut via = Via {
        transport: src.sub(transport),
        transport_kind: TransportKind::from_token(transport),
        host: src.sub(host_str),
        port: sent_by_port.and_then(|(_, p)| p),
        port_str: sent_by_port.map(|(digits, _)| src.sub(digits)),
        params: Vec::new(),
        branch: None,
        received: None,
        rport: None,
        end_offset: 0,
        rport_end: None,
    };

    while let Ok((after_semi, _)) = semi(rest) {
        let (rem, p) = param(src, after_semi)?;
        if p.is("branch") {
            via.branch = p.value.clone();
        } else if p.is("received") {
            via.received = p.value.clone();
        } else if p.is("rport") {
            via.rport = Some(p.value.clone().unwrap_or_default());
            via.rport_end = Some(offset_of(src.as_bytes(), rem));
        }
        via.params.push(p);
        rest = rem;
    }

    via.end_offset = offset_of(src.as_bytes(), rest);
    Ok((rest, via))
}

/// Parses every via-parm of one Via header value
pub fn parse_via_list(value: &Span) -> Result<Vec<Via>> {
    let malformed = |reason: &str| ParseError::header("Via", reason);

    let mut vias = Vec::new();
    let mut rest = value.as_bytes();
    loop {
        let (rem, via) = via_parm(value, rest).map_err(|_| malformed("invalid via-parm"))?;
        vias.push(via);
        match comma(rem) {
            Ok((next, _)) => rest = next,
            Err(_) => {
                let (rem, _) = sws(rem).map_err(|_| malformed("invalid via-parm"))?;
                if !rem.is_empty() {
                    return Err(malformed("trailing characters"));
                }
                return Ok(vias);
            }
        }
    }
}
