//! name-addr / addr-spec values used by From, To, Contact, Route and
//! Record-Route.

use std::fmt;

use crate::span::Span;
use crate::types::param::{find_param, Param};
use crate::types::uri::SipUri;

/// `[display-name] <uri> *(;param)` or a bare `uri *(;param)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    /// Display name, quotes included when it was quoted
    pub display: Option<Span>,
    /// The URI text between the angle brackets (or the bare addr-spec)
    pub addr: Span,
    pub uri: SipUri,
    /// Header parameters following the address
    pub params: Vec<Param>,
}

impl NameAddr {
    pub fn param(&self, name: &str) -> Option<&Param> {
        find_param(&self.params, name)
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(display) = &self.display {
            write!(f, "{display} ")?;
        }
        write!(f, "<{}>", self.addr)?;
        for param in &self.params {
            write!(f, ";{param}")?;
        }
        Ok(())
    }
}

/// Parsed Contact header value
///
/// `Contact: *` is only meaningful in a REGISTER that removes every
/// binding (RFC 3261 Section 10.2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contacts {
    Wildcard,
    List(Vec<NameAddr>),
}

impl Contacts {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Contacts::Wildcard)
    }

    /// The listed addresses, empty for the wildcard
    pub fn addresses(&self) -> &[NameAddr] {
        match self {
            Contacts::Wildcard => &[],
            Contacts::List(list) => list,
        }
    }

    pub fn into_addresses(self) -> Vec<NameAddr> {
        match self {
            Contacts::Wildcard => Vec::new(),
            Contacts::List(list) => list,
        }
    }
}

/// Parsed From or To header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromTo {
    pub name_addr: NameAddr,
    pub tag: Option<Span>,
}

impl FromTo {
    pub fn uri(&self) -> &SipUri {
        &self.name_addr.uri
    }

    pub fn tag_str(&self) -> Option<&str> {
        self.tag.as_ref().map(Span::as_str)
    }
}
