use std::net::SocketAddr;

use thiserror::Error;

/// A type alias for handling `Result`s with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the transport layer
#[derive(Error, Debug)]
pub enum Error {
    /// The datagram could not be handed to the socket
    #[error("Failed to send to {destination}: {reason}")]
    SendFailed {
        destination: SocketAddr,
        reason: String,
    },

    /// The socket could not be bound
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The transport was closed
    #[error("Transport closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
