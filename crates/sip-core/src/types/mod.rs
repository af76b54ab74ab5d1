//! Parsed SIP value types.
//!
//! All text fields are [`Span`](crate::Span)s into the buffer of the message
//! they were parsed from.

pub mod address;
pub mod cseq;
pub mod header;
pub mod method;
pub mod param;
pub mod uri;
pub mod via;

pub use address::{Contacts, FromTo, NameAddr};
pub use cseq::{CSeq, RAck};
pub use header::{Header, HeaderKind};
pub use method::Method;
pub use param::{find_param, Param};
pub use uri::{Scheme, SipUri, UriHeader, DEFAULT_SIP_PORT};
pub use via::{TransportKind, Via, MAGIC_COOKIE};
