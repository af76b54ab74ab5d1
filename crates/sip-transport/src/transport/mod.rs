pub mod udp;

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::Result;

/// Outbound side of a transport as seen by the transaction layer.
///
/// `send` never blocks: the transaction layer calls it while holding a
/// table bucket lock, so an implementation must hand the datagram off
/// (to the socket or to a queue) and return.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Returns the local address this transport is bound to
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Sends one datagram to `destination`
    fn send(&self, destination: SocketAddr, data: Bytes) -> Result<()>;

    /// Returns whether the transport has been closed
    fn is_closed(&self) -> bool;
}

/// Events emitted by the transport layer
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A datagram arrived
    DatagramReceived {
        /// The datagram contents
        data: Bytes,
        /// The sender address
        source: SocketAddr,
        /// The local address it arrived on
        destination: SocketAddr,
    },

    /// Error receiving from the socket
    Error {
        /// Error description
        error: String,
    },

    /// The transport was closed
    Closed,
}
