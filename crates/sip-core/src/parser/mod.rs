//! SIP message parsing.
//!
//! Parsing happens in two layers:
//!
//! * [`message`] splits a datagram into start line, header lines and body
//!   with explicit byte-level state machines. Line folding, bare LF and bare
//!   CR line ends are accepted.
//! * The header value grammars ([`uri`], [`via`], [`address`], [`cseq`],
//!   [`params`]) are built from `nom` combinators over byte slices. Each takes
//!   the [`Span`](crate::Span) it is parsing so that the values it returns
//!   share the message buffer.

use nom::IResult;

pub mod address;
pub mod cseq;
pub mod message;
pub mod params;
pub mod separators;
pub mod uri;
pub mod via;
pub mod whitespace;

/// Result type of the `nom` sub-parsers
pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

/// `token` characters (RFC 3261 Section 25.1)
pub fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'-' | b'.' | b'!' | b'%' | b'*' | b'_' | b'+' | b'`' | b'\'' | b'~'
        )
}

/// Builds a recoverable `nom` error at `input`
pub(crate) fn fail<O>(input: &[u8]) -> ParseResult<'_, O> {
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Verify,
    )))
}

/// Byte offset of `part` within `whole`; `part` must be a sub-slice of `whole`
pub(crate) fn offset_of(whole: &[u8], part: &[u8]) -> usize {
    part.as_ptr() as usize - whole.as_ptr() as usize
}
