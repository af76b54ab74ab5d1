use crate::span::Span;
use crate::types::method::Method;

/// Parsed CSeq header: `1*DIGIT LWS Method`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub num: u32,
    /// The sequence number as written; transactions hash on this text
    pub num_str: Span,
    pub method: Method,
    pub method_str: Span,
}

/// Parsed RAck header (RFC 3262 Section 7.2): the RSeq of the reliable
/// provisional reply being acknowledged, and the CSeq of its request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RAck {
    pub rseq: u32,
    pub cseq: u32,
    /// The CSeq number as written, for locating the INVITE's bucket
    pub cseq_str: Span,
    pub method: Method,
}
