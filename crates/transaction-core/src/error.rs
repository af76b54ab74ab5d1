use thiserror::Error;

use sigcore_sip_core::ParseError;

use crate::transaction::{TransactionId, TransactionState};

/// A type alias for handling `Result`s with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by transaction layer operations.
///
/// Inbound traffic never produces an error: a message that cannot be
/// parsed or matched is logged and dropped. These errors reach callers of
/// the outbound operations only.
#[derive(Error, Debug)]
pub enum Error {
    /// A message could not be written or parsed
    #[error("SIP parse error: {0}")]
    Parse(#[from] ParseError),

    /// The transport refused the datagram
    #[error("Transport error: {0}")]
    Transport(#[from] sigcore_sip_transport::Error),

    /// A final reply was already sent on this server transaction
    #[error("Transaction already replied with a final response")]
    AlreadyReplied,

    /// The operation is not allowed in the transaction's current state
    #[error("Cannot {operation} in state {state:?}")]
    InvalidTransition {
        state: TransactionState,
        operation: &'static str,
    },

    /// No live transaction has this id
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The string is not a transaction id
    #[error("Invalid transaction id: {0}")]
    InvalidTransactionId(String),

    /// The next hop could not be derived from the request
    #[error("No route to destination: {0}")]
    NoRoute(String),

    /// The request cannot be sent by this operation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A background task is gone
    #[error("Channel closed")]
    ChannelClosed,

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}
