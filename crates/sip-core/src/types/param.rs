use std::fmt;

use crate::span::Span;

/// A generic `name[=value]` parameter, as found on URIs, Via entries and
/// name-addr headers.
///
/// The value is kept exactly as it appeared on the wire, including the
/// surrounding quotes of a quoted-string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Span,
    pub value: Option<Span>,
}

impl Param {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Finds the first parameter called `name` (case-insensitive)
pub fn find_param<'a>(params: &'a [Param], name: &str) -> Option<&'a Param> {
    params.iter().find(|p| p.is(name))
}
