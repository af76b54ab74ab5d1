//! The transaction layer: RFC 3261 client and server transactions on top
//! of a [`Transport`]
//!
//! Inbound datagrams enter through [`TransactionLayer::deliver`] and are
//! parsed, matched against the [`TransactionTable`] and either absorbed,
//! answered from the retransmission buffer, or passed to the
//! [`TransactionUser`]. Outbound traffic goes through `send_request`,
//! `send_reply`, `send_ack` and `cancel`. Timers fire through
//! [`TransactionLayer::timer_expired`], normally called by a
//! [`TimerDriver`] started with [`TransactionLayer::start`].
//!
//! ## Locking
//!
//! Every state change happens with the transaction's bucket locked,
//! timer arming included: the lock is taken first and timer requests are
//! only queued under it. Messages for the transaction user are collected
//! while the lock is held and handed over once it is released.

mod routing;
mod timers;
mod uac;
mod uas;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use sigcore_sip_core::builder::ReplyBuilder;
use sigcore_sip_core::{Message, Method, RawMessage};
use sigcore_sip_transport::{Transport, TransportEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::TransactionConfig;
use crate::error::Result;
use crate::timer::{TimerDriver, TimerQueue, TimerWheel};
use crate::transaction::{TimerPayload, Transaction, TransactionId, TransactionState, TransactionTable};
use crate::user::{TimeoutKind, TransactionUser};

/// Message for the transaction user, dispatched after the bucket lock is
/// released
#[derive(Debug)]
enum Upcall {
    Request(Option<TransactionId>, Message),
    Reply(Option<TransactionId>, Message),
    Timeout(TransactionId, TimeoutKind, Message),
}

/// RFC 3261 transaction layer
pub struct TransactionLayer {
    config: TransactionConfig,
    table: TransactionTable,
    timers: TimerQueue<TimerPayload>,
    transport: Arc<dyn Transport>,
    user: Arc<dyn TransactionUser>,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for TransactionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLayer")
            .field("local_addr", &self.local_addr)
            .field("transport", &self.transport)
            .field("buckets", &self.table.bucket_count())
            .finish()
    }
}

impl TransactionLayer {
    /// Creates a layer sending through `transport` and passing messages up
    /// to `user`.
    ///
    /// Returns the timer wheel the layer arms its timers in. Hand it to
    /// [`TransactionLayer::start`], or tick it yourself and feed every
    /// expiry to [`TransactionLayer::timer_expired`].
    pub fn new(
        config: TransactionConfig,
        transport: Arc<dyn Transport>,
        user: Arc<dyn TransactionUser>,
    ) -> Result<(Arc<Self>, TimerWheel<TimerPayload>)> {
        let local_addr = transport.local_addr()?;
        let wheel = TimerWheel::new();
        let layer = Arc::new(Self {
            table: TransactionTable::new(config.bucket_count),
            timers: wheel.queue(),
            config,
            transport,
            user,
            local_addr,
        });
        debug!(local = %local_addr, "Transaction layer created");
        Ok((layer, wheel))
    }

    /// Ticks `wheel` from a tokio task at the configured resolution
    pub fn start(self: &Arc<Self>, wheel: TimerWheel<TimerPayload>) -> TimerDriver {
        let layer = self.clone();
        TimerDriver::spawn(wheel, self.config.tick, move |expired| {
            layer.timer_expired(expired)
        })
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of live transactions
    pub fn transaction_count(&self) -> usize {
        self.table.len()
    }

    /// Current state of a live transaction
    pub fn transaction_state(&self, id: TransactionId) -> Option<TransactionState> {
        self.table.lock(id.bucket).get(id).map(Transaction::state)
    }

    /// Handles one received datagram.
    ///
    /// Messages that do not parse are dropped. A request whose start line
    /// parsed but whose mandatory headers did not is answered with a
    /// stateless 400, unless it is an ACK.
    pub fn deliver(&self, data: Bytes, source: SocketAddr, local: SocketAddr) {
        let raw = match RawMessage::scan(data) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(%source, error = %e, "Dropping unparsable message");
                return;
            }
        };

        match Message::from_raw(raw.clone()) {
            Ok(msg) => self.received_msg(msg.with_addresses(source, local)),
            Err(e) => {
                debug!(%source, error = %e, "Dropping message with bad headers");
                if raw.is_request() && raw.method() != Some(&Method::Ack) {
                    let reply = ReplyBuilder::new(400, "Bad Request").build_raw(&raw);
                    if let Err(e) = self.transport.send(source, reply) {
                        warn!(%source, error = %e, "Failed to send 400 reply");
                    }
                }
            }
        }
    }

    /// Matches a parsed message and runs the state machine of its
    /// transaction
    pub fn received_msg(&self, msg: Message) {
        if msg.is_request() && *msg.method() == Method::Prack {
            // the INVITE may live in another bucket; it is released before
            // the PRACK's own bucket is taken
            self.prack_received(&msg);
        }
        let index = self.table.bucket_of(&msg);
        let upcall = {
            let mut bucket = self.table.lock(index);
            if msg.is_request() {
                self.update_uas_request(&mut bucket, msg)
            } else {
                self.update_uac_reply(&mut bucket, msg)
            }
        };
        if let Some(upcall) = upcall {
            self.dispatch(upcall);
        }
    }

    /// Feeds datagrams from a transport event stream into the layer until
    /// the transport closes
    pub async fn process_transport_events(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::DatagramReceived {
                    data,
                    source,
                    destination,
                } => self.deliver(data, source, destination),
                TransportEvent::Error { error } => warn!(error = %error, "Transport error"),
                TransportEvent::Closed => {
                    info!("Transport closed");
                    break;
                }
            }
        }
    }

    fn dispatch(&self, upcall: Upcall) {
        trace!(?upcall, "Passing message up");
        match upcall {
            Upcall::Request(id, msg) => self.user.on_request(id, msg),
            Upcall::Reply(id, msg) => self.user.on_reply(id, msg),
            Upcall::Timeout(id, kind, msg) => self.user.on_timeout(id, kind, msg),
        }
    }

    /// Re-sends the retransmission buffer of `t`.
    ///
    /// Send failures are logged only; the next timer fire tries again.
    fn retransmit(&self, t: &Transaction) {
        let (Some(buf), Some(dest)) = (t.retr_buf.as_ref(), t.retr_addr) else {
            trace!(id = %t.id, "Nothing to retransmit");
            return;
        };
        if let Err(e) = self.transport.send(dest, buf.clone()) {
            warn!(id = %t.id, %dest, error = %e, "Retransmission failed");
        }
    }
}
