//! Datagram transport for the SIP transaction layer
//!
//! The transaction layer never opens sockets itself. It sends through the
//! [`Transport`] trait and is fed the [`TransportEvent`]s produced by a
//! binding such as [`UdpTransport`].

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::udp::UdpTransport;
pub use transport::{Transport, TransportEvent};

/// Bind a UDP transport to the specified address
pub async fn bind_udp(
    addr: std::net::SocketAddr,
) -> Result<(UdpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{bind_udp, Error, Result, Transport, TransportEvent, UdpTransport};
}
