use nom::{
    bytes::complete::{tag, take_while1},
    combinator::recognize,
    sequence::{pair, tuple},
};

use super::whitespace::sws;
use super::{is_token_char, ParseResult};

pub fn slash(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b"/"), sws)))(input)
}

pub fn equal(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b"="), sws)))(input)
}

pub fn comma(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b","), sws)))(input)
}

pub fn semi(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b";"), sws)))(input)
}

pub fn colon(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b":"), sws)))(input)
}

/// LAQUOT = SWS "<"
pub fn laquot(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(sws, tag(b"<")))(input)
}

/// RAQUOT = ">" SWS
pub fn raquot(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(tag(b">"), sws))(input)
}

/// token = 1*(alphanum / "-" / "." / "!" / "%" / "*" / "_" / "+" / "`" / "'" / "~")
pub fn token(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(is_token_char)(input)
}

/// quoted-string = DQUOTE *(qdtext / quoted-pair) DQUOTE
///
/// Returns the string with its quotes; the closing quote must be present.
pub fn quoted_string(input: &[u8]) -> ParseResult<&[u8]> {
    let (_, _) = tag(b"\"")(input)?;
    let mut i = 1;
    while i < input.len() {
        match input[i] {
            b'\\' => i += 2,
            b'"' => return Ok((&input[i + 1..], &input[..i + 1])),
            _ => i += 1,
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}
