use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent};

// Default channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

// Largest datagram we accept
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// UDP transport for SIP messages
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    closed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    outbound_tx: mpsc::UnboundedSender<(SocketAddr, Bytes)>,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address
    pub async fn bind(
        addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::BindFailed { addr, source })?;
        let local_addr = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        let socket = Arc::new(socket);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let transport = UdpTransport {
            inner: Arc::new(UdpTransportInner {
                socket: socket.clone(),
                local_addr,
                closed: AtomicBool::new(false),
                shutdown_tx,
                outbound_tx,
            }),
        };

        tokio::spawn(receive_loop(socket.clone(), local_addr, events_tx, shutdown_rx.clone()));
        tokio::spawn(send_loop(socket, outbound_rx, shutdown_rx));

        Ok((transport, events_rx))
    }

    /// Stops the receive and send loops; later sends fail with [`Error::Closed`]
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("Closing UDP transport {}", self.inner.local_addr);
            let _ = self.inner.shutdown_tx.send(true);
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    events_tx: mpsc::Sender<TransportEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let result = tokio::select! {
            result = socket.recv_from(&mut buf) => result,
            _ = shutdown_rx.changed() => break,
        };

        let event = match result {
            Ok((len, source)) => {
                let datagram = &buf[..len];
                // CRLF keep-alives carry no message
                if datagram.iter().all(|b| matches!(b, b'\r' | b'\n')) {
                    trace!("Ignoring {} byte keep-alive from {}", len, source);
                    continue;
                }
                trace!("Received {} bytes from {}", len, source);
                TransportEvent::DatagramReceived {
                    data: Bytes::copy_from_slice(datagram),
                    source,
                    destination: local_addr,
                }
            }
            Err(e) => {
                error!("Error receiving UDP packet: {}", e);
                TransportEvent::Error {
                    error: format!("Error receiving packet: {}", e),
                }
            }
        };

        if events_tx.send(event).await.is_err() {
            debug!("Event receiver dropped, stopping UDP receive loop");
            return;
        }
    }

    let _ = events_tx.send(TransportEvent::Closed).await;
    info!("UDP receive loop terminated");
}

async fn send_loop(
    socket: Arc<UdpSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<(SocketAddr, Bytes)>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (destination, data) = tokio::select! {
            next = outbound_rx.recv() => match next {
                Some(item) => item,
                None => break,
            },
            _ = shutdown_rx.changed() => break,
        };
        if let Err(e) = socket.send_to(&data, destination).await {
            warn!("Failed to send {} bytes to {}: {}", data.len(), destination, e);
        }
    }
    trace!("UDP send loop terminated");
}

impl Transport for UdpTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr)
    }

    fn send(&self, destination: SocketAddr, data: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        debug!("Sending {} byte datagram to {}", data.len(), destination);
        match self.inner.socket.try_send_to(&data, destination) {
            Ok(_) => Ok(()),
            // socket buffer full: the send loop waits for writability
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => self
                .inner
                .outbound_tx
                .send((destination, data))
                .map_err(|_| Error::Closed),
            Err(e) => Err(Error::SendFailed {
                destination,
                reason: e.to_string(),
            }),
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UdpTransport({})", self.inner.local_addr)
    }
}
