use thiserror::Error;

/// A type alias for handling `Result`s with [`ParseError`]
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors produced while turning wire bytes into a [`Message`](crate::Message).
///
/// Every variant is recoverable: the offending message is dropped and the
/// engine keeps serving other traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first line is neither a request-line nor a status-line
    #[error("Malformed start line")]
    MalformedStartLine,

    /// The buffer ended in the middle of a token or header
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    /// One of Via, CSeq, From, To or Call-ID is absent
    #[error("Missing mandatory header: {0}")]
    MissingMandatoryHeader(&'static str),

    /// A header is present but its value does not follow its grammar
    #[error("Malformed {header} header: {reason}")]
    MalformedHeaderValue {
        header: &'static str,
        reason: String,
    },

    /// A URI could not be parsed
    #[error("Malformed URI: {0}")]
    MalformedUri(String),

    /// A method token contained non-token characters
    #[error("Invalid SIP method")]
    InvalidMethod,
}

impl ParseError {
    pub(crate) fn header(header: &'static str, reason: impl Into<String>) -> Self {
        ParseError::MalformedHeaderValue {
            header,
            reason: reason.into(),
        }
    }
}
