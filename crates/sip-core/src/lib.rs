//! Zero-copy SIP message parsing and message writers
//!
//! This crate turns datagrams into [`Message`] values whose fields are
//! [`Span`]s of the received buffer, and writes the messages a transaction
//! layer has to originate: requests, replies, ACKs and CANCELs.
//!
//! # Parsing
//!
//! ```
//! use sigcore_sip_core::prelude::*;
//!
//! let reply = Message::parse(
//!     "SIP/2.0 180 Ringing\r\n\
//!      Via: SIP/2.0/UDP 192.0.2.4;branch=z9hG4bKnashds8;received=192.0.2.3\r\n\
//!      To: Bob <sip:bob@biloxi.com>;tag=a6c85cf\r\n\
//!      From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
//!      Call-ID: a84b4c76e66710\r\n\
//!      CSeq: 314159 INVITE\r\n\
//!      Content-Length: 0\r\n\r\n",
//! )
//! .unwrap();
//!
//! assert_eq!(reply.status(), Some(180));
//! assert_eq!(reply.to.tag_str(), Some("a6c85cf"));
//! assert!(reply.via1.has_magic_cookie());
//! ```
//!
//! # Writing
//!
//! Outbound messages are written as text by the [`builder`] module and
//! parsed back, so that a transaction only ever holds parsed messages.

pub mod builder;
pub mod error;
pub mod message;
pub mod parser;
pub mod span;
pub mod types;

pub use error::{ParseError, Result};
pub use message::{Message, RawMessage, RequestLine, StartLine, StatusLine};
pub use span::Span;
pub use types::{
    CSeq, Contacts, FromTo, Header, HeaderKind, Method, NameAddr, Param, RAck, Scheme, SipUri,
    TransportKind, Via, DEFAULT_SIP_PORT, MAGIC_COOKIE,
};

/// Re-export of common types and functions
pub mod prelude {
    pub use crate::builder::{ReplyBuilder, RequestBuilder, ViaSpec};
    pub use crate::error::{ParseError, Result};
    pub use crate::message::{Message, RawMessage, StartLine};
    pub use crate::parser::address::{parse_contacts, parse_from_to, parse_name_addr_list};
    pub use crate::parser::uri::parse_uri;
    pub use crate::parser::via::parse_via_list;
    pub use crate::span::Span;
    pub use crate::types::{
        Contacts, FromTo, Header, HeaderKind, Method, NameAddr, SipUri, Via, MAGIC_COOKIE,
    };
}
