//! Zero-copy views into a message buffer.
//!
//! Every field of a parsed [`Message`](crate::Message) is a [`Span`]: a
//! reference-counted sub-slice of the single buffer the message was parsed
//! from. Cloning a span or a message never copies header bytes, and the
//! buffer lives as long as the last span that refers to it.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;

/// A sub-slice of a SIP message buffer.
///
/// Spans produced by the parser cover octets of the header section. Names
/// and interpreted values are ASCII; opaque values (a quoted display name,
/// a Subject) may carry any octets and are copied byte for byte.
#[derive(Clone, Default)]
pub struct Span(Bytes);

impl Span {
    /// Creates a span over static text
    pub const fn from_static(s: &'static str) -> Self {
        Span(Bytes::from_static(s.as_bytes()))
    }

    /// Creates a span owning a copy of `s`
    pub fn copy_from_str(s: &str) -> Self {
        Span(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Anchors `part`, which must lie inside `parent`, as a span of the same buffer
    pub(crate) fn within(parent: &Bytes, part: &[u8]) -> Self {
        Span(parent.slice_ref(part))
    }

    /// Returns the span of `part`, a sub-slice of this span's bytes
    pub fn sub(&self, part: &[u8]) -> Span {
        Span::within(&self.0, part)
    }

    /// Returns the span covering `range` of this span
    pub fn slice(&self, range: std::ops::Range<usize>) -> Span {
        Span(self.0.slice(range))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the span as text; empty if the span is not UTF-8. Use
    /// [`Span::as_bytes`] where the octets must survive unchanged.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the underlying reference-counted bytes
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn eq_ignore_ascii_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.as_bytes())
    }

    /// Strips surrounding linear whitespace, folds included
    pub fn trim(&self) -> Span {
        let bytes = self.as_bytes();
        let start = bytes
            .iter()
            .position(|b| !is_lws(*b))
            .unwrap_or(bytes.len());
        let end = bytes
            .iter()
            .rposition(|b| !is_lws(*b))
            .map_or(start, |p| p + 1);
        self.slice(start..end)
    }
}

pub(crate) fn is_lws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

impl From<Bytes> for Span {
    fn from(bytes: Bytes) -> Self {
        Span(bytes)
    }
}

impl From<&'static str> for Span {
    fn from(s: &'static str) -> Self {
        Span::from_static(s)
    }
}

impl From<String> for Span {
    fn from(s: String) -> Self {
        Span(Bytes::from(s))
    }
}

impl AsRef<[u8]> for Span {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Span {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Span {}

impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl PartialEq<str> for Span {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for Span {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}
