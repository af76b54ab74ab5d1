use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use super::{put_body, put_header};
use crate::error::Result;
use crate::message::Message;
use crate::parser::address::parse_name_addr;
use crate::span::Span;
use crate::types::{Method, NameAddr, SipUri, MAGIC_COOKIE};

/// The top Via written into an outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaSpec {
    pub transport: String,
    /// `host[:port]`
    pub sent_by: String,
    /// Branch value without the magic cookie
    pub branch: String,
    /// Ask for symmetric response routing (RFC 3581)
    pub rport: bool,
}

impl ViaSpec {
    pub fn udp(sent_by: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            transport: "UDP".to_string(),
            sent_by: sent_by.into(),
            branch: branch.into(),
            rport: true,
        }
    }

    fn write(&self, out: &mut BytesMut) {
        let mut value = format!(
            "SIP/2.0/{} {};branch={MAGIC_COOKIE}{}",
            self.transport, self.sent_by, self.branch
        );
        if self.rport {
            value.push_str(";rport");
        }
        put_header(out, "Via", value.as_bytes());
    }
}

/// Builder for outbound requests.
///
/// # Example
///
/// ```rust
/// use sigcore_sip_core::prelude::*;
///
/// let request = RequestBuilder::new(Method::Invite, "sip:bob@192.0.2.4").unwrap()
///     .from("Alice", "sip:alice@atlanta.com", Some("1928301774"))
///     .to("Bob", "sip:bob@biloxi.com", None)
///     .call_id("a84b4c76e66710@pc33.atlanta.com")
///     .cseq(314159)
///     .contact("sip:alice@192.0.2.1")
///     .body("application/sdp", "v=0\r\n")
///     .build(&ViaSpec::udp("192.0.2.1", "776asdhds"))
///     .unwrap();
///
/// assert_eq!(request.via1.branch.as_ref().unwrap(), "z9hG4bK776asdhds");
/// assert_eq!(&request.body[..], b"v=0\r\n");
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    uri: SipUri,
    route: Vec<NameAddr>,
    headers: Vec<(String, Bytes)>,
    content_type: Option<String>,
    body: Bytes,
}

impl RequestBuilder {
    /// Creates a builder for `method` sent to `uri`
    pub fn new(method: Method, uri: &str) -> Result<Self> {
        Ok(Self::with_uri(method, SipUri::from_str(uri)?))
    }

    pub fn with_uri(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            route: Vec::new(),
            headers: Vec::new(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &SipUri {
        &self.uri
    }

    pub fn route_set(&self) -> &[NameAddr] {
        &self.route
    }

    /// Sets a header, replacing any earlier value of the same name
    fn set(mut self, name: &str, value: String) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), Bytes::from(value)));
        self
    }

    fn name_addr(display: &str, uri: &str, tag: Option<&str>) -> String {
        let mut value = if display.is_empty() {
            format!("<{uri}>")
        } else {
            format!("\"{display}\" <{uri}>")
        };
        if let Some(tag) = tag {
            value.push_str(";tag=");
            value.push_str(tag);
        }
        value
    }

    pub fn from(self, display: &str, uri: &str, tag: Option<&str>) -> Self {
        let value = Self::name_addr(display, uri, tag);
        self.set("From", value)
    }

    pub fn to(self, display: &str, uri: &str, tag: Option<&str>) -> Self {
        let value = Self::name_addr(display, uri, tag);
        self.set("To", value)
    }

    pub fn call_id(self, call_id: &str) -> Self {
        self.set("Call-ID", call_id.to_string())
    }

    /// Sets the CSeq number; the method is always the request's
    pub fn cseq(self, seq: u32) -> Self {
        let value = format!("{seq} {}", self.method);
        self.set("CSeq", value)
    }

    /// Sets the CSeq number from its text, kept as written (`007` stays `007`)
    pub fn cseq_str(self, num: &str) -> Self {
        let value = format!("{num} {}", self.method);
        self.set("CSeq", value)
    }

    pub fn max_forwards(self, value: u32) -> Self {
        self.set("Max-Forwards", value.to_string())
    }

    pub fn contact(self, uri: &str) -> Self {
        self.set("Contact", format!("<{uri}>"))
    }

    /// Appends an entry to the route set
    pub fn route(mut self, value: &str) -> Result<Self> {
        let span = Span::copy_from_str(value);
        self.route.push(parse_name_addr(&span, "Route")?);
        Ok(self)
    }

    pub fn route_entries(mut self, route: Vec<NameAddr>) -> Self {
        self.route = route;
        self
    }

    /// Appends a header verbatim
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), Bytes::copy_from_slice(value.as_bytes())));
        self
    }

    /// Adds a header whose value is copied octet for octet from a parsed one
    pub fn header_span(mut self, name: &str, value: &Span) -> Self {
        self.headers.push((name.to_string(), value.bytes().clone()));
        self
    }

    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }

    /// Rewrites the request for a strict-routing first hop
    /// (RFC 3261 Section 12.2.1.1): the first route entry becomes the
    /// request-URI and the old request-URI is appended to the route set.
    ///
    /// Returns `false` when the route set is empty or starts with a loose
    /// router, leaving the request untouched.
    pub fn apply_strict_route(&mut self) -> Result<bool> {
        match self.route.first() {
            Some(first) if !first.uri.is_loose_router() => {}
            _ => return Ok(false),
        }
        let first = self.route.remove(0);
        let old_uri = Span::from(format!("<{}>", self.uri));
        self.route.push(parse_name_addr(&old_uri, "Route")?);
        self.uri = first.uri;
        Ok(true)
    }

    /// Writes the request with `via` on top and parses it back
    pub fn build(&self, via: &ViaSpec) -> Result<Message> {
        let mut out = BytesMut::with_capacity(512 + self.body.len());
        out.put_slice(format!("{} {} SIP/2.0\r\n", self.method, self.uri).as_bytes());
        via.write(&mut out);
        for route in &self.route {
            put_header(&mut out, "Route", route.to_string().as_bytes());
        }
        if !self.has("Max-Forwards") {
            put_header(&mut out, "Max-Forwards", b"70");
        }
        for (name, value) in &self.headers {
            put_header(&mut out, name, value);
        }
        if !self.has("CSeq") {
            put_header(&mut out, "CSeq", format!("1 {}", self.method).as_bytes());
        }
        if let Some(content_type) = self.content_type.as_ref().filter(|_| !self.body.is_empty()) {
            put_header(&mut out, "Content-Type", content_type.as_bytes());
        }
        put_body(&mut out, &self.body);

        Message::parse(out.freeze())
    }

    fn has(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}
