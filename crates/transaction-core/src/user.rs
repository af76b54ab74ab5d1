//! The transaction user: whatever sits on top of the transaction layer

use serde::{Deserialize, Serialize};
use sigcore_sip_core::Message;
use tokio::sync::mpsc;
use tracing::warn;

use crate::transaction::TransactionId;

/// Why a transaction gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeoutKind {
    /// Client transaction: no final reply before Timer B or Timer F
    NoReply,
    /// INVITE server transaction: no ACK before Timer H
    NoAck,
    /// INVITE server transaction: no PRACK for a reliable provisional
    /// reply before Timer H. The transaction stays open for a final reply.
    NoPrack,
}

/// Receiver of the messages the transaction layer passes up.
///
/// Callbacks run on the thread that delivered the message or fired the
/// timer, never with a bucket lock held, so they may call back into the
/// layer (for instance `send_reply` from `on_request`).
pub trait TransactionUser: Send + Sync {
    /// A new request, or an ACK.
    ///
    /// `transaction` is `None` for an ACK matching no transaction (the
    /// end-to-end ACK of a 2xx whose server transaction is gone).
    fn on_request(&self, transaction: Option<TransactionId>, request: Message);

    /// A reply for a client transaction.
    ///
    /// `transaction` is `None` for a 2xx to an INVITE that matched no
    /// transaction (forked or late retransmitted 2xx).
    fn on_reply(&self, transaction: Option<TransactionId>, reply: Message);

    /// The transaction timed out and has been removed
    fn on_timeout(&self, transaction: TransactionId, kind: TimeoutKind, request: Message);
}

/// Events emitted by a [`ChannelUser`]
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// Request passed up
    Request {
        /// Server transaction, `None` for an out-of-transaction ACK
        transaction: Option<TransactionId>,
        request: Message,
    },

    /// Reply passed up
    Reply {
        /// Client transaction, `None` for an unmatched 2xx
        transaction: Option<TransactionId>,
        reply: Message,
    },

    /// Transaction timed out
    Timeout {
        transaction: TransactionId,
        kind: TimeoutKind,
        /// The request the transaction was created for
        request: Message,
    },
}

/// [`TransactionUser`] forwarding every callback as a
/// [`TransactionEvent`] on an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelUser {
    events: mpsc::UnboundedSender<TransactionEvent>,
}

impl ChannelUser {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransactionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    fn emit(&self, event: TransactionEvent) {
        if self.events.send(event).is_err() {
            warn!("Transaction event receiver dropped");
        }
    }
}

impl TransactionUser for ChannelUser {
    fn on_request(&self, transaction: Option<TransactionId>, request: Message) {
        self.emit(TransactionEvent::Request {
            transaction,
            request,
        });
    }

    fn on_reply(&self, transaction: Option<TransactionId>, reply: Message) {
        self.emit(TransactionEvent::Reply { transaction, reply });
    }

    fn on_timeout(&self, transaction: TransactionId, kind: TimeoutKind, request: Message) {
        self.emit(TransactionEvent::Timeout {
            transaction,
            kind,
            request,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_user_forwards_events() {
        let (user, mut rx) = ChannelUser::new();
        let request = Message::parse(
            "OPTIONS sip:a@192.0.2.1 SIP/2.0\r\n\
             Via: SIP/2.0/UDP 192.0.2.2;branch=z9hG4bKx\r\n\
             From: <sip:b@h>;tag=1\r\n\
             To: <sip:a@h>\r\n\
             Call-ID: c\r\n\
             CSeq: 1 OPTIONS\r\n\r\n",
        )
        .unwrap();
        let id = TransactionId { bucket: 2, serial: 9 };

        user.on_timeout(id, TimeoutKind::NoReply, request.clone());
        user.on_request(None, request);

        match rx.recv().await.unwrap() {
            TransactionEvent::Timeout { transaction, kind, .. } => {
                assert_eq!(transaction, id);
                assert_eq!(kind, TimeoutKind::NoReply);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            TransactionEvent::Request { transaction: None, .. }
        ));
    }
}
