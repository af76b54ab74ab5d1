use bytes::{BufMut, Bytes, BytesMut};

use super::{put_body, put_copied, put_header};
use crate::error::Result;
use crate::message::{put_unfolded, Message, RawMessage};
use crate::types::HeaderKind;

/// Builder for replies to a received request (RFC 3261 Section 8.2.6).
///
/// Via, From, To, Call-ID, CSeq and Record-Route are copied from the
/// request in their original order. The first Via gets `received` and a
/// filled-in `rport` as required by RFC 3261 Section 18.2.1 and RFC 3581.
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    code: u16,
    reason: String,
    to_tag: Option<String>,
    contact: Option<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    body: Bytes,
}

impl ReplyBuilder {
    pub fn new(code: u16, reason: &str) -> Self {
        Self {
            code,
            reason: reason.to_string(),
            to_tag: None,
            contact: None,
            headers: Vec::new(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Tag appended to the To header when the request's To has none
    pub fn to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    /// Contact URI; not written into 100 replies
    pub fn contact(mut self, uri: &str) -> Self {
        self.contact = Some(uri.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Marks a provisional reply as reliable (RFC 3262): adds
    /// `Require: 100rel` and the given RSeq
    pub fn reliable(self, rseq: u32) -> Self {
        self.header("Require", "100rel").header("RSeq", &rseq.to_string())
    }

    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }

    pub fn has_to_tag(&self) -> bool {
        self.to_tag.is_some()
    }

    fn put_status_line(&self, out: &mut BytesMut) {
        out.put_slice(format!("SIP/2.0 {} {}\r\n", self.code, self.reason).as_bytes());
    }

    fn put_to(&self, out: &mut BytesMut, name: &str, value: &[u8], has_tag: bool) {
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        put_unfolded(out, value);
        if let Some(tag) = self.to_tag.as_ref().filter(|_| !has_tag) {
            out.put_slice(b";tag=");
            out.put_slice(tag.as_bytes());
        }
        out.put_slice(b"\r\n");
    }

    fn put_trailer(&self, out: &mut BytesMut) {
        if let Some(contact) = self.contact.as_ref().filter(|_| self.code > 100) {
            let value = if contact.contains('<') {
                contact.clone()
            } else {
                format!("<{contact}>")
            };
            put_header(out, "Contact", value.as_bytes());
        }
        for (name, value) in &self.headers {
            put_header(out, name, value.as_bytes());
        }
        if let Some(content_type) = self.content_type.as_ref().filter(|_| !self.body.is_empty()) {
            put_header(out, "Content-Type", content_type.as_bytes());
        }
        put_body(out, &self.body);
    }

    /// Writes the reply to `request` and parses it back
    pub fn build(&self, request: &Message) -> Result<Message> {
        let mut out = BytesMut::with_capacity(request.as_bytes().len() + self.body.len() + 64);
        self.put_status_line(&mut out);

        let mut first_via = true;
        for header in &request.headers {
            match header.kind {
                HeaderKind::Via if first_via => {
                    first_via = false;
                    self.put_first_via(&mut out, request, header.name.as_str(), header.value.as_bytes());
                }
                HeaderKind::To => {
                    self.put_to(&mut out, header.name.as_str(), header.value.as_bytes(), request.to.tag.is_some());
                }
                HeaderKind::Via
                | HeaderKind::From
                | HeaderKind::CallId
                | HeaderKind::CSeq
                | HeaderKind::RecordRoute => put_copied(&mut out, &header.name, &header.value),
                _ => {}
            }
        }
        self.put_trailer(&mut out);

        Message::parse(out.freeze())
    }

    /// Writes the first Via of `request`, adding `rport=<port>` and
    /// `received=<ip>` for the source address
    fn put_first_via(&self, out: &mut BytesMut, request: &Message, name: &str, value: &[u8]) {
        let via = &request.via1;
        let Some(source) = request.source else {
            put_header(out, name, value);
            return;
        };

        let end = via.end_offset.min(value.len());
        let mut line = Vec::with_capacity(value.len() + 32);
        match via.rport_end {
            Some(rport_end) if via.rport.as_ref().is_some_and(|r| r.is_empty()) && rport_end <= end => {
                line.extend_from_slice(&value[..rport_end]);
                line.extend_from_slice(format!("={}", source.port()).as_bytes());
                line.extend_from_slice(&value[rport_end..end]);
            }
            _ => line.extend_from_slice(&value[..end]),
        }
        let source_ip = source.ip().to_string();
        if via.received.is_none() && via.host_str() != source_ip {
            line.extend_from_slice(b";received=");
            line.extend_from_slice(source_ip.as_bytes());
        }
        line.extend_from_slice(&value[end..]);
        put_header(out, name, &line);
    }

    /// Writes a reply to a request whose mandatory headers did not parse.
    ///
    /// The headers are copied verbatim; the result is not parsed back.
    pub fn build_raw(&self, request: &RawMessage) -> Bytes {
        let mut out = BytesMut::with_capacity(request.as_bytes().len() + 64);
        self.put_status_line(&mut out);
        for header in &request.headers {
            match header.kind {
                HeaderKind::To => {
                    let has_tag = header
                        .value
                        .as_bytes()
                        .windows(5)
                        .any(|w| w.eq_ignore_ascii_case(b";tag="));
                    self.put_to(&mut out, header.name.as_str(), header.value.as_bytes(), has_tag);
                }
                HeaderKind::Via | HeaderKind::From | HeaderKind::CallId | HeaderKind::CSeq => {
                    put_copied(&mut out, &header.name, &header.value)
                }
                _ => {}
            }
        }
        self.put_trailer(&mut out);
        out.freeze()
    }
}
