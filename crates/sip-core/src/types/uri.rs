//! # SIP URI
//!
//! Parsed form of a SIP or SIPS URI as defined in
//! [RFC 3261 Section 19.1](https://datatracker.ietf.org/doc/html/rfc3261#section-19.1):
//!
//! ```text
//! sip:user:password@host:port;uri-parameters?headers
//! ```
//!
//! URIs with any other scheme (`tel:`, `mailto:` ...) are accepted with their
//! scheme-specific part kept opaque.
//!
//! The port is optional. A missing port and an explicit `:0` are both stored
//! as `None`; call sites apply [`DEFAULT_SIP_PORT`] through
//! [`SipUri::port_or_default`].

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::span::Span;
use crate::types::param::{find_param, Param};

/// Port used when a SIP URI or Via sent-by does not carry one
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
    /// Any other scheme; the remainder is kept in [`SipUri::opaque`]
    Other,
}

/// One `name[=value]` entry of the `?h1=v1&h2=v2` URI component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriHeader {
    pub name: Span,
    pub value: Option<Span>,
}

/// A parsed URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipUri {
    pub scheme: Scheme,
    pub scheme_str: Span,
    pub user: Option<Span>,
    pub password: Option<Span>,
    /// Host as written, brackets included for IPv6 references
    pub host: Span,
    pub port: Option<u16>,
    pub port_str: Option<Span>,
    pub params: Vec<Param>,
    pub headers: Vec<UriHeader>,
    /// Scheme-specific part of a non-SIP URI
    pub opaque: Option<Span>,
    pub(crate) raw: Span,
}

impl SipUri {
    pub fn is_sip(&self) -> bool {
        matches!(self.scheme, Scheme::Sip | Scheme::Sips)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SIP_PORT)
    }

    /// Host without the IPv6 reference brackets
    pub fn host_str(&self) -> &str {
        let host = self.host.as_str();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        find_param(&self.params, name)
    }

    /// Value of the `transport` URI parameter
    pub fn transport(&self) -> Option<&Span> {
        self.param("transport").and_then(|p| p.value.as_ref())
    }

    /// `true` when the URI carries the `lr` parameter (RFC 3261 Section 19.1.1)
    pub fn is_loose_router(&self) -> bool {
        self.param("lr").is_some()
    }

    /// The URI exactly as it appeared on the wire
    pub fn as_span(&self) -> &Span {
        &self.raw
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

impl FromStr for SipUri {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        let span = Span::from(Bytes::copy_from_slice(s.as_bytes()));
        crate::parser::uri::parse_uri(&span)
    }
}
