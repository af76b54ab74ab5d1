//! Generic parameters: `*( SEMI name [ EQUAL value ] )`.

use nom::{branch::alt, bytes::complete::take_while, bytes::complete::take_while1};

use super::separators::{equal, quoted_string, semi};
use super::ParseResult;
use crate::span::Span;
use crate::types::Param;

/// Characters allowed in a parameter name
pub fn is_param_name_char(c: u8) -> bool {
    is_param_char(c) && c != b'='
}

/// Characters allowed in an unquoted parameter value
pub fn is_param_char(c: u8) -> bool {
    c > b' '
        && c != 0x7f
        && !matches!(c, b';' | b',' | b'?' | b'&' | b'"' | b'<' | b'>')
}

/// Parses one `name[=value]`
pub fn param<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, Param> {
    let (rem, name) = take_while1(is_param_name_char)(input)?;
    match equal(rem) {
        Ok((after_eq, _)) => {
            let (rem, value) = alt((quoted_string, take_while(is_param_char)))(after_eq)?;
            Ok((
                rem,
                Param {
                    name: src.sub(name),
                    value: Some(src.sub(value)),
                },
            ))
        }
        Err(_) => Ok((
            rem,
            Param {
                name: src.sub(name),
                value: None,
            },
        )),
    }
}

/// Parses any number of `;param` entries.
///
/// Stops without consuming at the first byte that does not start a
/// parameter. A `;` with no parameter after it is an error.
pub fn parse_params<'a>(src: &Span, input: &'a [u8]) -> ParseResult<'a, Vec<Param>> {
    let mut params = Vec::new();
    let mut rest = input;
    while let Ok((after_semi, _)) = semi(rest) {
        let (rem, p) = param(src, after_semi)?;
        params.push(p);
        rest = rem;
    }
    Ok((rest, params))
}
