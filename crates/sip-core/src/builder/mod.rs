//! Writers for the messages a transaction layer originates.
//!
//! Every writer produces wire text and parses it back into a [`Message`],
//! so that what is stored in a transaction is exactly what was sent.
//!
//! * [`RequestBuilder`]: outbound requests, with the top Via supplied at
//!   build time through a [`ViaSpec`]
//! * [`ReplyBuilder`]: replies to a received request (RFC 3261 Section 8.2.6)
//! * [`non_2xx_ack`], [`cancel`] and [`ack_for_2xx`]: the requests derived
//!   from an INVITE or from its replies (RFC 3261 Section 17.1.1.3, 9.1, 13.2.2.4)
//!
//! [`Message`]: crate::Message

mod ack;
mod ids;
mod reply;
mod request;

pub use ack::{ack_for_2xx, cancel, non_2xx_ack};
pub use ids::{generate_branch, generate_call_id, generate_tag, stateless_to_tag};
pub use reply::ReplyBuilder;
pub use request::{RequestBuilder, ViaSpec};

use bytes::{BufMut, BytesMut};

use crate::message::put_unfolded;
use crate::span::Span;

/// Writes `Name: value` with folds collapsed
pub(crate) fn put_header(out: &mut BytesMut, name: &str, value: &[u8]) {
    out.put_slice(name.as_bytes());
    out.put_slice(b": ");
    put_unfolded(out, value);
    out.put_slice(b"\r\n");
}

/// Writes a parsed header line, keeping the name as it was received
pub(crate) fn put_copied(out: &mut BytesMut, name: &Span, value: &Span) {
    put_header(out, name.as_str(), value.as_bytes());
}

/// Writes Content-Length, the empty line and the body
pub(crate) fn put_body(out: &mut BytesMut, body: &[u8]) {
    put_header(out, "Content-Length", body.len().to_string().as_bytes());
    out.put_slice(b"\r\n");
    out.put_slice(body);
}
