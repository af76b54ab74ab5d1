// Shared helpers for the transaction layer tests
//
// The layer runs over a MockTransport that records every datagram, and
// reports to a RecordingUser. The timer wheel is ticked by hand so that
// timer tests run in virtual time.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use sigcore_sip_core::builder::{ReplyBuilder, RequestBuilder};
use sigcore_sip_core::{Message, Method};
use sigcore_sip_transport::{Error as TransportError, Result as TransportResult, Transport};
use sigcore_transaction_core::timer::TimerWheel;
use sigcore_transaction_core::{
    TimeoutKind, TimerPayload, TransactionConfig, TransactionId, TransactionLayer, TransactionUser,
};

pub fn local_addr() -> SocketAddr {
    "192.0.2.1:5060".parse().unwrap()
}

pub fn peer_addr() -> SocketAddr {
    "192.0.2.2:5060".parse().unwrap()
}

/// Transport recording every datagram instead of sending it
#[derive(Debug)]
pub struct MockTransport {
    local: SocketAddr,
    sent: Mutex<Vec<(SocketAddr, Bytes)>>,
    failing: AtomicBool,
}

impl MockTransport {
    pub fn new(local: SocketAddr) -> Self {
        Self {
            local,
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Every datagram sent so far, parsed
    pub fn sent(&self) -> Vec<(SocketAddr, Message)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(dest, data)| (*dest, Message::parse(data.clone()).unwrap()))
            .collect()
    }

    pub fn last_sent(&self) -> (SocketAddr, Message) {
        self.sent().pop().expect("Nothing was sent")
    }

    pub fn last_raw(&self) -> (SocketAddr, Bytes) {
        self.sent.lock().unwrap().last().cloned().expect("Nothing was sent")
    }
}

impl Transport for MockTransport {
    fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.local)
    }

    fn send(&self, destination: SocketAddr, data: Bytes) -> TransportResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                destination,
                reason: "mock failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push((destination, data));
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// One callback received by the RecordingUser
#[derive(Debug, Clone)]
pub enum Recorded {
    Request(Option<TransactionId>, Message),
    Reply(Option<TransactionId>, Message),
    Timeout(TransactionId, TimeoutKind, Message),
}

/// Transaction user recording every callback
#[derive(Debug, Default)]
pub struct RecordingUser {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingUser {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<(Option<TransactionId>, Message)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Request(id, msg) => Some((id, msg)),
                _ => None,
            })
            .collect()
    }

    pub fn replies(&self) -> Vec<(Option<TransactionId>, Message)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Reply(id, msg) => Some((id, msg)),
                _ => None,
            })
            .collect()
    }

    pub fn timeouts(&self) -> Vec<(TransactionId, TimeoutKind)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Timeout(id, kind, _) => Some((id, kind)),
                _ => None,
            })
            .collect()
    }
}

impl TransactionUser for RecordingUser {
    fn on_request(&self, transaction: Option<TransactionId>, request: Message) {
        self.events.lock().unwrap().push(Recorded::Request(transaction, request));
    }

    fn on_reply(&self, transaction: Option<TransactionId>, reply: Message) {
        self.events.lock().unwrap().push(Recorded::Reply(transaction, reply));
    }

    fn on_timeout(&self, transaction: TransactionId, kind: TimeoutKind, request: Message) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Timeout(transaction, kind, request));
    }
}

/// A transaction layer over the mock transport with a hand-ticked wheel
pub struct Harness {
    pub layer: Arc<TransactionLayer>,
    pub wheel: TimerWheel<TimerPayload>,
    pub transport: Arc<MockTransport>,
    pub user: Arc<RecordingUser>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(TransactionConfig::default())
    }

    pub fn with_config(config: TransactionConfig) -> Self {
        let transport = Arc::new(MockTransport::new(local_addr()));
        let user = Arc::new(RecordingUser::default());
        let (layer, wheel) =
            TransactionLayer::new(config, transport.clone(), user.clone()).unwrap();
        Self {
            layer,
            wheel,
            transport,
            user,
        }
    }

    /// Advances virtual time by `ticks` wheel ticks
    pub fn tick(&mut self, ticks: u32) {
        for _ in 0..ticks {
            for expired in self.wheel.tick() {
                self.layer.timer_expired(expired);
            }
        }
    }

    /// Feeds a datagram from the peer
    pub fn deliver(&self, data: impl Into<Bytes>) {
        self.deliver_from(data, peer_addr());
    }

    pub fn deliver_from(&self, data: impl Into<Bytes>, source: SocketAddr) {
        self.layer.deliver(data.into(), source, local_addr());
    }
}

/// INVITE from us to the peer
pub fn invite() -> RequestBuilder {
    RequestBuilder::new(Method::Invite, "sip:bob@192.0.2.2")
        .unwrap()
        .from("Alice", "sip:alice@atlanta.com", Some("a73kszlfl"))
        .to("Bob", "sip:bob@biloxi.com", None)
        .call_id("uac-invite-1@192.0.2.1")
        .cseq(1)
        .contact("sip:alice@192.0.2.1")
}

/// OPTIONS from us to the peer
pub fn options() -> RequestBuilder {
    RequestBuilder::new(Method::Options, "sip:carol@192.0.2.2")
        .unwrap()
        .from("", "sip:alice@atlanta.com", Some("o1"))
        .to("", "sip:carol@chicago.com", None)
        .call_id("uac-options-1@192.0.2.1")
        .cseq(7)
}

/// The peer's reply to a request we sent
pub fn reply_to(request: &Message, code: u16, reason: &str, to_tag: Option<&str>) -> Bytes {
    let mut builder = ReplyBuilder::new(code, reason).contact("sip:bob@192.0.2.2");
    if let Some(tag) = to_tag {
        builder = builder.to_tag(tag);
    }
    builder.build(request).unwrap().as_bytes().clone()
}

/// An INVITE from the peer
pub fn incoming_invite(branch: &str) -> String {
    format!(
        "INVITE sip:alice@192.0.2.1 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.2:5060;branch={branch};rport\r\n\
         Max-Forwards: 70\r\n\
         From: Bob <sip:bob@biloxi.com>;tag=b1\r\n\
         To: Alice <sip:alice@atlanta.com>\r\n\
         Call-ID: uas-invite-1@192.0.2.2\r\n\
         CSeq: 20 INVITE\r\n\
         Contact: <sip:bob@192.0.2.2>\r\n\
         Content-Length: 0\r\n\r\n"
    )
}

/// An ACK from the peer for the incoming INVITE
pub fn incoming_ack(branch: &str, to_tag: &str) -> String {
    format!(
        "ACK sip:alice@192.0.2.1 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.2:5060;branch={branch};rport\r\n\
         Max-Forwards: 70\r\n\
         From: Bob <sip:bob@biloxi.com>;tag=b1\r\n\
         To: Alice <sip:alice@atlanta.com>;tag={to_tag}\r\n\
         Call-ID: uas-invite-1@192.0.2.2\r\n\
         CSeq: 20 ACK\r\n\
         Content-Length: 0\r\n\r\n"
    )
}

/// A PRACK from the peer acknowledging a reliable provisional reply to
/// the incoming INVITE
pub fn incoming_prack(branch: &str, to_tag: &str, rack: &str) -> String {
    format!(
        "PRACK sip:alice@192.0.2.1 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.2:5060;branch={branch};rport\r\n\
         Max-Forwards: 70\r\n\
         From: Bob <sip:bob@biloxi.com>;tag=b1\r\n\
         To: Alice <sip:alice@atlanta.com>;tag={to_tag}\r\n\
         Call-ID: uas-invite-1@192.0.2.2\r\n\
         CSeq: 21 PRACK\r\n\
         RAck: {rack}\r\n\
         Content-Length: 0\r\n\r\n"
    )
}

/// A non-INVITE request from the peer
pub fn incoming_request(method: &str, branch: &str) -> String {
    format!(
        "{method} sip:alice@192.0.2.1 SIP/2.0\r\n\
         Via: SIP/2.0/UDP 192.0.2.2:5060;branch={branch}\r\n\
         Max-Forwards: 70\r\n\
         From: Bob <sip:bob@biloxi.com>;tag=b2\r\n\
         To: Alice <sip:alice@atlanta.com>;tag=a2\r\n\
         Call-ID: uas-{method}-1@192.0.2.2\r\n\
         CSeq: 30 {method}\r\n\
         Content-Length: 0\r\n\r\n"
    )
}
