//! Header classification.
//!
//! The kind of every header is decided once, while the header block is
//! scanned, from its (possibly compact) name. Values stay raw spans; the
//! headers the transaction layer needs are parsed into typed fields of the
//! [`Message`](crate::Message).

use serde::{Deserialize, Serialize};

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderKind {
    Via,
    To,
    From,
    CallId,
    CSeq,
    Contact,
    ContentType,
    ContentLength,
    Route,
    RecordRoute,
    MaxForwards,
    Require,
    Supported,
    Subject,
    RSeq,
    RAck,
    Other,
}

impl HeaderKind {
    /// Classifies a header name, compact forms included (RFC 3261 Section 7.3.3)
    pub fn from_name(name: &[u8]) -> Self {
        if name.len() == 1 {
            return match name[0].to_ascii_lowercase() {
                b'v' => HeaderKind::Via,
                b't' => HeaderKind::To,
                b'f' => HeaderKind::From,
                b'i' => HeaderKind::CallId,
                b'm' => HeaderKind::Contact,
                b'c' => HeaderKind::ContentType,
                b'l' => HeaderKind::ContentLength,
                b'k' => HeaderKind::Supported,
                b's' => HeaderKind::Subject,
                _ => HeaderKind::Other,
            };
        }

        const NAMES: &[(&str, HeaderKind)] = &[
            ("Via", HeaderKind::Via),
            ("To", HeaderKind::To),
            ("From", HeaderKind::From),
            ("Call-ID", HeaderKind::CallId),
            ("CSeq", HeaderKind::CSeq),
            ("Contact", HeaderKind::Contact),
            ("Content-Type", HeaderKind::ContentType),
            ("Content-Length", HeaderKind::ContentLength),
            ("Route", HeaderKind::Route),
            ("Record-Route", HeaderKind::RecordRoute),
            ("Max-Forwards", HeaderKind::MaxForwards),
            ("Require", HeaderKind::Require),
            ("Supported", HeaderKind::Supported),
            ("Subject", HeaderKind::Subject),
            ("RSeq", HeaderKind::RSeq),
            ("RAck", HeaderKind::RAck),
        ];

        NAMES
            .iter()
            .find(|(n, _)| n.as_bytes().eq_ignore_ascii_case(name))
            .map_or(HeaderKind::Other, |(_, kind)| *kind)
    }

    /// Canonical long-form name; `None` for [`HeaderKind::Other`]
    pub fn canonical_name(&self) -> Option<&'static str> {
        Some(match self {
            HeaderKind::Via => "Via",
            HeaderKind::To => "To",
            HeaderKind::From => "From",
            HeaderKind::CallId => "Call-ID",
            HeaderKind::CSeq => "CSeq",
            HeaderKind::Contact => "Contact",
            HeaderKind::ContentType => "Content-Type",
            HeaderKind::ContentLength => "Content-Length",
            HeaderKind::Route => "Route",
            HeaderKind::RecordRoute => "Record-Route",
            HeaderKind::MaxForwards => "Max-Forwards",
            HeaderKind::Require => "Require",
            HeaderKind::Supported => "Supported",
            HeaderKind::Subject => "Subject",
            HeaderKind::RSeq => "RSeq",
            HeaderKind::RAck => "RAck",
            HeaderKind::Other => return None,
        })
    }
}

/// One header line: name and raw value, folds included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: HeaderKind,
    pub name: Span,
    pub value: Span,
}

impl Header {
    /// `true` if this header is called `name`, long or compact form
    pub fn is_named(&self, name: &str) -> bool {
        if self.name.eq_ignore_ascii_case(name) {
            return true;
        }
        let kind = HeaderKind::from_name(name.as_bytes());
        kind != HeaderKind::Other && kind == self.kind
    }
}
