//! Sequence number headers.
//!
//! ```text
//! CSeq = "CSeq" HCOLON 1*DIGIT LWS Method
//! RSeq = "RSeq" HCOLON response-num
//! RAck = "RAck" HCOLON response-num LWS CSeq-num LWS Method
//! ```

use nom::character::complete::digit1;

use super::separators::token;
use super::whitespace::{lws, sws};
use crate::error::{ParseError, Result};
use crate::span::Span;
use crate::types::{CSeq, Method, RAck};

/// Largest RSeq value (RFC 3262 Section 7.1)
pub const MAX_RSEQ: u32 = (1 << 31) - 1;

/// A decimal number fitting 32 bits, with its text
fn seq_num(input: &[u8]) -> std::result::Result<(&[u8], &[u8], u32), &'static str> {
    let (rem, digits) =
        digit1::<_, nom::error::Error<&[u8]>>(input).map_err(|_| "missing sequence number")?;
    let num = std::str::from_utf8(digits)
        .ok()
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or("sequence number out of range")?;
    Ok((rem, digits, num))
}

fn response_num(input: &[u8]) -> std::result::Result<(&[u8], u32), &'static str> {
    let (rem, _, num) = seq_num(input)?;
    if num == 0 || num > MAX_RSEQ {
        return Err("response number out of range");
    }
    Ok((rem, num))
}

pub fn parse_cseq(value: &Span) -> Result<CSeq> {
    let malformed = |reason: &str| ParseError::header("CSeq", reason);
    let input = value.as_bytes();

    let (rem, num_str, num) = seq_num(input).map_err(malformed)?;

    let (rem, _) = lws(rem).map_err(|_| malformed("missing method"))?;
    let (rem, method_str) = token(rem).map_err(|_| malformed("missing method"))?;
    let (rem, _) = sws(rem).map_err(|_| malformed("missing method"))?;
    if !rem.is_empty() {
        return Err(malformed("trailing characters"));
    }

    Ok(CSeq {
        num,
        num_str: value.sub(num_str),
        method: Method::from_token(method_str)?,
        method_str: value.sub(method_str),
    })
}

/// Parses an RSeq header value
pub fn parse_rseq(value: &Span) -> Result<u32> {
    let malformed = |reason: &str| ParseError::header("RSeq", reason);
    let (rem, num) = response_num(value.as_bytes()).map_err(malformed)?;
    let (rem, _) = sws(rem).map_err(|_| malformed("trailing characters"))?;
    if !rem.is_empty() {
        return Err(malformed("trailing characters"));
    }
    Ok(num)
}

/// Parses an RAck header value
pub fn parse_rack(value: &Span) -> Result<RAck> {
    let malformed = |reason: &str| ParseError::header("RAck", reason);
    let input = value.as_bytes();

    let (rem, rseq) = response_num(input).map_err(malformed)?;
    let (rem, _) = lws(rem).map_err(|_| malformed("missing CSeq number"))?;
    let (rem, cseq_str, cseq) = seq_num(rem).map_err(malformed)?;
    let (rem, _) = lws(rem).map_err(|_| malformed("missing method"))?;
    let (rem, method_str) = token(rem).map_err(|_| malformed("missing method"))?;
    let (rem, _) = sws(rem).map_err(|_| malformed("trailing characters"))?;
    if !rem.is_empty() {
        return Err(malformed("trailing characters"));
    }

    Ok(RAck {
        rseq,
        cseq,
        cseq_str: value.sub(cseq_str),
        method: Method::from_token(method_str)?,
    })
}
