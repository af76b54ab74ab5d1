use bytes::{BufMut, BytesMut};

use super::request::RequestBuilder;
use super::{put_body, put_copied, put_header};
use crate::error::{ParseError, Result};
use crate::message::Message;
use crate::span::Span;
use crate::types::{Header, HeaderKind, Method};

fn first_header<'a>(msg: &'a Message, kind: HeaderKind, name: &'static str) -> Result<&'a Header> {
    msg.headers_of(kind)
        .next()
        .ok_or(ParseError::MissingMandatoryHeader(name))
}

/// Writes the first via-parm of `msg`'s top Via
fn put_top_via(out: &mut BytesMut, msg: &Message) -> Result<()> {
    let via = first_header(msg, HeaderKind::Via, "Via")?;
    let end = msg.via1.end_offset.min(via.value.len());
    put_header(out, via.name.as_str(), &via.value.as_bytes()[..end]);
    Ok(())
}

fn put_request_line(out: &mut BytesMut, method: &str, invite: &Message) -> Result<()> {
    let uri = invite
        .request_uri()
        .ok_or(ParseError::MalformedStartLine)?;
    out.put_slice(format!("{method} {uri} SIP/2.0\r\n").as_bytes());
    Ok(())
}

fn put_routes(out: &mut BytesMut, msg: &Message) {
    for header in msg.headers_of(HeaderKind::Route) {
        put_copied(out, &header.name, &header.value);
    }
}

fn put_cseq(out: &mut BytesMut, num: &Span, method: &str) {
    put_header(out, "CSeq", format!("{num} {method}").as_bytes());
}

/// ACK for a non-2xx final reply to `invite` (RFC 3261 Section 17.1.1.3).
///
/// It belongs to the INVITE transaction: same top Via and request-URI,
/// the INVITE's Route headers, From, Call-ID and CSeq number, and the To
/// of the reply, which carries the remote tag.
pub fn non_2xx_ack(invite: &Message, reply: &Message) -> Result<Message> {
    let mut out = BytesMut::with_capacity(invite.as_bytes().len());
    put_request_line(&mut out, "ACK", invite)?;
    put_top_via(&mut out, invite)?;
    put_routes(&mut out, invite);

    let from = first_header(invite, HeaderKind::From, "From")?;
    put_copied(&mut out, &from.name, &from.value);
    let to = first_header(reply, HeaderKind::To, "To")?;
    put_copied(&mut out, &to.name, &to.value);
    let call_id = first_header(invite, HeaderKind::CallId, "Call-ID")?;
    put_copied(&mut out, &call_id.name, &call_id.value);
    put_cseq(&mut out, &invite.cseq.num_str, "ACK");
    put_body(&mut out, b"");

    Message::parse(out.freeze())
}

/// CANCEL for a pending `invite` (RFC 3261 Section 9.1)
pub fn cancel(invite: &Message) -> Result<Message> {
    let mut out = BytesMut::with_capacity(invite.as_bytes().len());
    put_request_line(&mut out, "CANCEL", invite)?;
    put_top_via(&mut out, invite)?;
    put_header(&mut out, "Max-Forwards", b"70");

    for (kind, name) in [
        (HeaderKind::To, "To"),
        (HeaderKind::From, "From"),
        (HeaderKind::CallId, "Call-ID"),
    ] {
        let header = first_header(invite, kind, name)?;
        put_copied(&mut out, &header.name, &header.value);
    }
    put_cseq(&mut out, &invite.cseq.num_str, "CANCEL");
    put_routes(&mut out, invite);
    put_body(&mut out, b"");

    Message::parse(out.freeze())
}

/// Prepares the ACK for a 2xx reply to an INVITE (RFC 3261 Section 13.2.2.4).
///
/// The request-URI is the reply's Contact and the route set is the reply's
/// Record-Route in reverse order, with the strict-router rewrite applied.
/// The caller supplies the Via, so the ACK gets a branch of its own.
pub fn ack_for_2xx(reply: &Message) -> Result<RequestBuilder> {
    let contact = reply
        .contacts()?
        .into_addresses()
        .into_iter()
        .next()
        .ok_or(ParseError::MissingMandatoryHeader("Contact"))?;
    let mut route = reply.record_route_set()?;
    route.reverse();

    let from = first_header(reply, HeaderKind::From, "From")?;
    let to = first_header(reply, HeaderKind::To, "To")?;
    let call_id = first_header(reply, HeaderKind::CallId, "Call-ID")?;

    let mut builder = RequestBuilder::with_uri(Method::Ack, contact.uri)
        .route_entries(route)
        .header_span("From", &from.value)
        .header_span("To", &to.value)
        .header_span("Call-ID", &call_id.value)
        .cseq_str(reply.cseq.num_str.as_str())
        .max_forwards(70);
    builder.apply_strict_route()?;
    Ok(builder)
}
