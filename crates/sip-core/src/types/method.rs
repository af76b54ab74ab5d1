use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::parser::is_token_char;

/// SIP request method.
///
/// The methods the transaction layer reasons about are enumerated; any other
/// token is kept verbatim in [`Method::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Invite,
    Ack,
    Prack,
    Options,
    Bye,
    Cancel,
    Register,
    /// Extension method (e.g. SUBSCRIBE, INFO)
    Other(String),
}

impl Method {
    /// Classifies a method token.
    ///
    /// Method names are case-sensitive (RFC 3261 Section 7.1); a token with
    /// non-token octets is rejected.
    pub fn from_token(token: &[u8]) -> Result<Self> {
        if token.is_empty() || !token.iter().all(|c| is_token_char(*c)) {
            return Err(ParseError::InvalidMethod);
        }
        Ok(match token {
            b"INVITE" => Method::Invite,
            b"ACK" => Method::Ack,
            b"PRACK" => Method::Prack,
            b"OPTIONS" => Method::Options,
            b"BYE" => Method::Bye,
            b"CANCEL" => Method::Cancel,
            b"REGISTER" => Method::Register,
            other => Method::Other(String::from_utf8_lossy(other).into_owned()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Prack => "PRACK",
            Method::Options => "OPTIONS",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Other(s) => s,
        }
    }

    pub fn is_invite(&self) -> bool {
        matches!(self, Method::Invite)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        Method::from_token(s.as_bytes())
    }
}
