//! # SIP Via header entry
//!
//! One `via-parm` of a Via header
//! ([RFC 3261 Section 20.42](https://datatracker.ietf.org/doc/html/rfc3261#section-20.42)):
//!
//! ```text
//! Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds;rport
//! ```
//!
//! The `branch`, `received` and `rport` parameters are picked out at parse
//! time since transaction matching and reply routing depend on them. The
//! sent-by port is kept in its textual form as well, so that it can be
//! compared and re-emitted verbatim.

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::types::param::{find_param, Param};
use crate::types::uri::DEFAULT_SIP_PORT;

/// Branch prefix announcing RFC 3261 transaction matching
pub const MAGIC_COOKIE: &str = "z9hG4bK";

/// Transport named in the sent-protocol of a Via entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
    Sctp,
    Other,
}

impl TransportKind {
    pub fn from_token(token: &[u8]) -> Self {
        if token.eq_ignore_ascii_case(b"UDP") {
            TransportKind::Udp
        } else if token.eq_ignore_ascii_case(b"TCP") {
            TransportKind::Tcp
        } else if token.eq_ignore_ascii_case(b"TLS") {
            TransportKind::Tls
        } else if token.eq_ignore_ascii_case(b"SCTP") {
            TransportKind::Sctp
        } else {
            TransportKind::Other
        }
    }
}

/// A parsed Via entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub transport: Span,
    pub transport_kind: TransportKind,
    /// sent-by host, brackets included for IPv6 references
    pub host: Span,
    pub port: Option<u16>,
    pub port_str: Option<Span>,
    pub params: Vec<Param>,
    pub branch: Option<Span>,
    pub received: Option<Span>,
    /// `Some` when the `rport` parameter is present; empty if it has no value
    pub rport: Option<Span>,
    /// Offset of the end of this entry within the header value
    pub(crate) end_offset: usize,
    /// Offset just past the `rport` parameter within the header value
    pub(crate) rport_end: Option<usize>,
}

impl Via {
    /// `true` if the branch is the RFC 3261 magic cookie followed by at
    /// least one more character. A bare cookie gets legacy matching.
    pub fn has_magic_cookie(&self) -> bool {
        self.branch.as_ref().is_some_and(|b| {
            b.len() > MAGIC_COOKIE.len() && b.as_bytes().starts_with(MAGIC_COOKIE.as_bytes())
        })
    }

    /// The branch with the magic cookie stripped, for cookie branches
    pub fn branch_suffix(&self) -> Option<&[u8]> {
        if !self.has_magic_cookie() {
            return None;
        }
        self.branch
            .as_ref()
            .map(|b| &b.as_bytes()[MAGIC_COOKIE.len()..])
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        find_param(&self.params, name)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SIP_PORT)
    }

    /// Port requested through a filled-in `rport` parameter
    pub fn rport_port(&self) -> Option<u16> {
        self.rport
            .as_ref()
            .and_then(|r| r.as_str().parse::<u16>().ok())
            .filter(|p| *p != 0)
    }

    /// Host without the IPv6 reference brackets
    pub fn host_str(&self) -> &str {
        let host = self.host.as_str();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }
}
