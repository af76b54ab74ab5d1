//! # SIP message model
//!
//! A [`Message`] owns the single buffer it was parsed from. Its start line,
//! every header and every parsed field are [`Span`]s of that buffer.
//!
//! Parsing is split in two steps:
//!
//! 1. [`RawMessage::scan`] recognizes the start line and splits the header
//!    block into `(name, value)` pairs, keeping their order.
//! 2. [`Message::from_raw`] parses the headers every transaction depends on
//!    (Via, CSeq, From, To and Call-ID) and applies Content-Length.
//!
//! A message that fails the second step still has a usable start line and
//! header list, which is enough to answer it statelessly with a 400.
//!
//! ```
//! use sigcore_sip_core::{Message, Method};
//!
//! let msg = Message::parse(
//!     "OPTIONS sip:carol@chicago.com SIP/2.0\r\n\
//!      Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKhjhs8ass877\r\n\
//!      To: <sip:carol@chicago.com>\r\n\
//!      From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
//!      Call-ID: a84b4c76e66710\r\n\
//!      CSeq: 63104 OPTIONS\r\n\
//!      Content-Length: 0\r\n\r\n",
//! )
//! .unwrap();
//!
//! assert_eq!(msg.method(), &Method::Options);
//! assert_eq!(msg.from.tag_str(), Some("1928301774"));
//! ```

use std::fmt;
use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ParseError, Result};
use crate::parser::address::{parse_contacts, parse_from_to, parse_name_addr_list};
use crate::parser::cseq::{parse_cseq, parse_rack, parse_rseq};
use crate::parser::message::scan;
use crate::parser::via::parse_via_list;
use crate::span::{is_lws, Span};
use crate::types::{CSeq, Contacts, FromTo, Header, HeaderKind, Method, NameAddr, RAck, SipUri, Via};

/// `Method SP Request-URI SP SIP-Version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub method_str: Span,
    pub uri: SipUri,
}

/// `SIP-Version SP Status-Code SP Reason-Phrase`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub reason: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request(RequestLine),
    Reply(StatusLine),
}

/// A message split into start line, header lines and body
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub(crate) buf: Bytes,
    pub start: StartLine,
    pub headers: Vec<Header>,
    /// Everything after the empty line, Content-Length not yet applied
    pub body: Bytes,
}

impl RawMessage {
    /// Splits `buf` into start line, headers and body
    pub fn scan(buf: impl Into<Bytes>) -> Result<Self> {
        scan(buf.into())
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start, StartLine::Request(_))
    }

    /// Method of a request
    pub fn method(&self) -> Option<&Method> {
        match &self.start {
            StartLine::Request(line) => Some(&line.method),
            StartLine::Reply(_) => None,
        }
    }

    /// The buffer the message was scanned from
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }

    fn first(&self, kind: HeaderKind) -> Option<&Header> {
        self.headers.iter().find(|h| h.kind == kind)
    }
}

/// A parsed SIP request or reply
#[derive(Debug, Clone)]
pub struct Message {
    buf: Bytes,
    pub start: StartLine,
    /// All headers in wire order
    pub headers: Vec<Header>,
    /// First entry of the first Via header
    pub via1: Via,
    pub from: FromTo,
    pub to: FromTo,
    pub cseq: CSeq,
    pub call_id: Span,
    /// Value of the first Contact header
    pub contact: Option<Span>,
    pub content_type: Option<Span>,
    pub content_length: Option<usize>,
    /// Values of the Route headers, in order
    pub route: Vec<Span>,
    /// Values of the Record-Route headers, in order
    pub record_route: Vec<Span>,
    pub body: Bytes,
    /// Address the message was received from
    pub source: Option<SocketAddr>,
    /// Local address the message was received on
    pub local: Option<SocketAddr>,
}

impl Message {
    /// Parses one complete SIP message
    pub fn parse(buf: impl Into<Bytes>) -> Result<Self> {
        Self::from_raw(RawMessage::scan(buf)?)
    }

    /// Parses the mandatory headers of a scanned message
    pub fn from_raw(raw: RawMessage) -> Result<Self> {
        let via_header = raw
            .first(HeaderKind::Via)
            .ok_or(ParseError::MissingMandatoryHeader("Via"))?;
        let via1 = parse_via_list(&via_header.value)?
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::header("Via", "no via-parm"))?;

        let cseq = parse_cseq(
            &raw.first(HeaderKind::CSeq)
                .ok_or(ParseError::MissingMandatoryHeader("CSeq"))?
                .value,
        )?;

        let from = parse_from_to(
            &raw.first(HeaderKind::From)
                .ok_or(ParseError::MissingMandatoryHeader("From"))?
                .value,
            "From",
        )?;
        if from.tag.as_ref().map_or(true, Span::is_empty) {
            return Err(ParseError::header("From", "missing tag"));
        }

        let to = parse_from_to(
            &raw.first(HeaderKind::To)
                .ok_or(ParseError::MissingMandatoryHeader("To"))?
                .value,
            "To",
        )?;

        let call_id = raw
            .first(HeaderKind::CallId)
            .ok_or(ParseError::MissingMandatoryHeader("Call-ID"))?
            .value
            .clone();
        if call_id.is_empty() {
            return Err(ParseError::header("Call-ID", "empty value"));
        }

        let mut body = raw.body.clone();
        let content_length = match raw.first(HeaderKind::ContentLength) {
            Some(h) => {
                let len = h
                    .value
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| ParseError::header("Content-Length", "not a number"))?;
                if len > body.len() {
                    return Err(ParseError::header(
                        "Content-Length",
                        format!("{len} exceeds the {} body octets", body.len()),
                    ));
                }
                body.truncate(len);
                Some(len)
            }
            None => None,
        };

        let contact = raw.first(HeaderKind::Contact).map(|h| h.value.clone());
        let content_type = raw.first(HeaderKind::ContentType).map(|h| h.value.clone());
        let collect = |kind| {
            raw.headers
                .iter()
                .filter(|h| h.kind == kind)
                .map(|h| h.value.clone())
                .collect::<Vec<_>>()
        };
        let route = collect(HeaderKind::Route);
        let record_route = collect(HeaderKind::RecordRoute);

        Ok(Message {
            buf: raw.buf,
            start: raw.start,
            headers: raw.headers,
            via1,
            from,
            to,
            cseq,
            call_id,
            contact,
            content_type,
            content_length,
            route,
            record_route,
            body,
            source: None,
            local: None,
        })
    }

    /// Records where the message came from and which local address got it
    pub fn with_addresses(mut self, source: SocketAddr, local: SocketAddr) -> Self {
        self.source = Some(source);
        self.local = Some(local);
        self
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start, StartLine::Request(_))
    }

    pub fn is_reply(&self) -> bool {
        !self.is_request()
    }

    /// The request method, or for a reply the method of its CSeq
    pub fn method(&self) -> &Method {
        match &self.start {
            StartLine::Request(line) => &line.method,
            StartLine::Reply(_) => &self.cseq.method,
        }
    }

    pub fn request_uri(&self) -> Option<&SipUri> {
        match &self.start {
            StartLine::Request(line) => Some(&line.uri),
            StartLine::Reply(_) => None,
        }
    }

    /// Status code of a reply
    pub fn status(&self) -> Option<u16> {
        match &self.start {
            StartLine::Request(_) => None,
            StartLine::Reply(line) => Some(line.code),
        }
    }

    pub fn reason(&self) -> Option<&Span> {
        match &self.start {
            StartLine::Request(_) => None,
            StartLine::Reply(line) => Some(&line.reason),
        }
    }

    /// First header called `name`, long or compact form
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.is_named(name))
    }

    /// Every header called `name`, in order
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> + 'a {
        self.headers.iter().filter(move |h| h.is_named(name))
    }

    pub fn headers_of(&self, kind: HeaderKind) -> impl Iterator<Item = &Header> + '_ {
        self.headers.iter().filter(move |h| h.kind == kind)
    }

    /// Parses every Via entry of every Via header
    pub fn vias(&self) -> Result<Vec<Via>> {
        let mut vias = Vec::new();
        for header in self.headers_of(HeaderKind::Via) {
            vias.extend(parse_via_list(&header.value)?);
        }
        Ok(vias)
    }

    /// Parses the Contact header
    pub fn contacts(&self) -> Result<Contacts> {
        match &self.contact {
            Some(value) => parse_contacts(value),
            None => Ok(Contacts::List(Vec::new())),
        }
    }

    /// Parses the first RSeq header, if any
    pub fn rseq(&self) -> Result<Option<u32>> {
        self.headers_of(HeaderKind::RSeq)
            .next()
            .map(|h| parse_rseq(&h.value))
            .transpose()
    }

    /// Parses the first RAck header, if any
    pub fn rack(&self) -> Result<Option<RAck>> {
        self.headers_of(HeaderKind::RAck)
            .next()
            .map(|h| parse_rack(&h.value))
            .transpose()
    }

    /// Parses the Route set, all Route headers concatenated
    pub fn route_set(&self) -> Result<Vec<NameAddr>> {
        parse_all(&self.route, "Route")
    }

    /// Parses the Record-Route set, all Record-Route headers concatenated
    pub fn record_route_set(&self) -> Result<Vec<NameAddr>> {
        parse_all(&self.record_route, "Record-Route")
    }

    /// The buffer the message was parsed from
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }

    /// Serializes the message: start line, headers in order with folds
    /// collapsed to one space, an empty line and the body
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.buf.len() + 16);
        match &self.start {
            StartLine::Request(line) => {
                out.put_slice(line.method_str.as_bytes());
                out.put_u8(b' ');
                out.put_slice(line.uri.as_span().as_bytes());
                out.put_slice(b" SIP/2.0\r\n");
            }
            StartLine::Reply(line) => {
                out.put_slice(format!("SIP/2.0 {} ", line.code).as_bytes());
                out.put_slice(line.reason.as_bytes());
                out.put_slice(b"\r\n");
            }
        }
        for header in &self.headers {
            out.put_slice(header.name.as_bytes());
            out.put_slice(b": ");
            put_unfolded(&mut out, header.value.as_bytes());
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"\r\n");
        out.put_slice(&self.body);
        out.freeze()
    }
}

fn parse_all(values: &[Span], header: &'static str) -> Result<Vec<NameAddr>> {
    let mut set = Vec::new();
    for value in values {
        set.extend(parse_name_addr_list(value, header)?);
    }
    Ok(set)
}

/// Writes `value`, replacing each line fold and the whitespace around it
/// with one SP
pub(crate) fn put_unfolded(out: &mut BytesMut, value: &[u8]) {
    let mut i = 0;
    while i < value.len() {
        if value[i] == b'\r' || value[i] == b'\n' {
            while out.last().is_some_and(|c| *c == b' ' || *c == b'\t') {
                out.truncate(out.len() - 1);
            }
            while i < value.len() && is_lws(value[i]) {
                i += 1;
            }
            out.put_u8(b' ');
        } else {
            out.put_u8(value[i]);
            i += 1;
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            StartLine::Request(line) => write!(f, "{} {}", line.method_str, line.uri),
            StartLine::Reply(line) => write!(f, "{} {}", line.code, line.reason),
        }
    }
}
