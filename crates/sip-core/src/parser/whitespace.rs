use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    combinator::recognize,
    sequence::tuple,
};

use super::ParseResult;

pub(crate) fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Parses a single whitespace character (SP or HTAB)
pub fn wsp(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(alt((tag(b" "), tag(b"\t"))))(input)
}

/// Parses optional whitespace (0 or more SP or HTAB)
pub fn owsp(input: &[u8]) -> ParseResult<&[u8]> {
    take_while(is_wsp)(input)
}

/// Parses a line end: CRLF, a bare LF or a bare CR
pub fn crlf(input: &[u8]) -> ParseResult<&[u8]> {
    alt((tag(b"\r\n"), tag(b"\n"), tag(b"\r")))(input)
}

/// Parses Linear White Space (RFC 3261 Section 25.1)
/// LWS = [*WSP CRLF] 1*WSP
pub fn lws(input: &[u8]) -> ParseResult<&[u8]> {
    alt((
        recognize(tuple((owsp, crlf, take_while1(is_wsp)))),
        take_while1(is_wsp),
    ))(input)
}

/// SWS = [LWS]; consecutive folds are consumed as one run
pub fn sws(input: &[u8]) -> ParseResult<&[u8]> {
    let mut rest = input;
    while let Ok((next, _)) = lws(rest) {
        rest = next;
    }
    Ok((rest, &input[..input.len() - rest.len()]))
}
