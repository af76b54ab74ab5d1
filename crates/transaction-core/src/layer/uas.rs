use sigcore_sip_core::builder::{generate_tag, stateless_to_tag, ReplyBuilder};
use sigcore_sip_core::{Message, Method};
use tracing::debug;

use super::{TransactionLayer, Upcall};
use crate::error::{Error, Result};
use crate::timer::TimerKind;
use crate::transaction::{match_prack, Bucket, TransactionId, TransactionState, TransactionType};

impl TransactionLayer {
    /// Sends a reply on a server transaction.
    ///
    /// Replies with a code above 100 get a To-tag when the request had
    /// none: the builder's, the one already used by this transaction, or
    /// a fresh one. Once a final reply has been sent, further replies are
    /// rejected with [`Error::AlreadyReplied`].
    ///
    /// A provisional reply to an INVITE carrying an RSeq header is sent
    /// reliably (RFC 3262): the transaction enters
    /// [`TransactionState::ProceedingRel`] and re-sends it on Timer G until
    /// the matching PRACK arrives or Timer H gives up. Only one reliable
    /// provisional reply may be pending at a time.
    ///
    /// The state change is kept even if the transport fails; the error is
    /// returned and, for non-2xx INVITE replies, Timer G retries the send.
    pub fn send_reply(&self, id: TransactionId, reply: ReplyBuilder) -> Result<()> {
        let code = reply.code();
        if !(100..700).contains(&code) {
            return Err(Error::InvalidRequest(format!("invalid status code {code}")));
        }

        let mut bucket = self.table.lock(id.bucket);
        let t = bucket.find(id).ok_or(Error::TransactionNotFound(id))?;
        if t.kind != TransactionType::Uas {
            return Err(Error::InvalidTransition {
                state: t.state,
                operation: "reply on a client transaction",
            });
        }
        if t.reply_status >= 200 {
            return Err(Error::AlreadyReplied);
        }

        let mut reply = reply;
        if code > 100 && t.request.to.tag.is_none() && !reply.has_to_tag() {
            let tag = t
                .to_tag
                .as_ref()
                .map(|tag| tag.to_string())
                .unwrap_or_else(generate_tag);
            reply = reply.to_tag(tag);
        }
        let msg = reply.build(&t.request)?;
        let dest = self.reply_destination(&t.request)?;
        let buf = msg.as_bytes().clone();

        let invite = t.is_invite();
        let rseq = match msg.rseq()? {
            Some(rseq) if invite && code > 100 && code < 200 => Some(rseq),
            _ => None,
        };
        if rseq.is_some() && t.state == TransactionState::ProceedingRel {
            return Err(Error::InvalidTransition {
                state: t.state,
                operation: "reliable provisional reply before the previous one was acknowledged",
            });
        }

        if code > 100 {
            t.to_tag = msg.to.tag.clone();
        }
        t.reply_status = code;
        // the pending reliable reply keeps its retransmission buffer
        if code >= 200 || t.state != TransactionState::ProceedingRel {
            t.retr_buf = Some(buf.clone());
        }
        t.retr_addr = Some(dest);

        match code {
            300..=699 => {
                t.state = TransactionState::Completed;
                if invite {
                    t.reset_timer(&self.timers, TimerKind::G, self.config.retransmit_ticks(TimerKind::G, 0), 0);
                    t.reset_timer(&self.timers, TimerKind::H, self.config.timer_ticks(TimerKind::H), 0);
                } else {
                    t.reset_timer(&self.timers, TimerKind::J, self.config.timer_ticks(TimerKind::J), 0);
                }
            }
            200..=299 if invite => {
                // kept only to recognise the ACK; Timer H bounds the wait
                t.state = TransactionState::Terminated200;
                t.clear_timer(&self.timers, TimerKind::G);
                t.reset_timer(&self.timers, TimerKind::H, self.config.timer_ticks(TimerKind::H), 0);
            }
            200..=299 => {
                t.state = TransactionState::Completed;
                t.reset_timer(&self.timers, TimerKind::J, self.config.timer_ticks(TimerKind::J), 0);
            }
            _ => {
                if let Some(rseq) = rseq {
                    t.state = TransactionState::ProceedingRel;
                    t.last_rseq = rseq;
                    t.reset_timer(&self.timers, TimerKind::G, self.config.retransmit_ticks(TimerKind::G, 0), 0);
                    t.reset_timer(&self.timers, TimerKind::H, self.config.timer_ticks(TimerKind::H), 0);
                } else if t.state == TransactionState::Trying {
                    t.state = TransactionState::Proceeding;
                }
            }
        }
        debug!(id = %id, code, state = ?t.state, %dest, "Reply sent");

        self.transport.send(dest, buf)?;
        Ok(())
    }

    /// Sends a reply without any transaction state.
    ///
    /// A reply above 100 gets a To-tag derived from the request, so that a
    /// retransmitted request is answered identically. ACKs are never
    /// replied to.
    pub fn send_sl_reply(&self, request: &Message, code: u16, reason: &str) -> Result<()> {
        if *request.method() == Method::Ack {
            return Err(Error::InvalidRequest("ACK cannot be replied to".to_string()));
        }
        let mut builder = ReplyBuilder::new(code, reason);
        if code > 100 && request.to.tag.is_none() {
            builder = builder.to_tag(stateless_to_tag(request));
        }
        let reply = builder.build(request)?;
        let dest = self.reply_destination(request)?;
        debug!(code, %dest, "Stateless reply sent");
        self.transport.send(dest, reply.as_bytes().clone())?;
        Ok(())
    }

    /// Runs a server transaction's state machine for a received request
    pub(super) fn update_uas_request(&self, bucket: &mut Bucket, request: Message) -> Option<Upcall> {
        let matched = bucket
            .match_request(&request)
            .map(|t| (t.id, t.request.method() != request.method()));

        match matched {
            Some((id, true)) => self.uas_ack(bucket, id, request),
            Some((id, false)) => {
                debug!(id = %id, method = %request.method(), "Request retransmission");
                if let Some(t) = bucket.find(id) {
                    self.retransmit(t);
                }
                None
            }
            None if *request.method() == Method::Ack => {
                debug!(call_id = %request.call_id, "ACK matched no transaction, passing up");
                Some(Upcall::Request(None, request))
            }
            None => {
                let id = self.table.next_id(bucket.index());
                bucket.add_transaction(id, request.clone(), TransactionType::Uas);
                debug!(id = %id, method = %request.method(), "New server transaction");
                Some(Upcall::Request(Some(id), request))
            }
        }
    }

    /// Stops the retransmission of the reliable provisional reply a PRACK
    /// acknowledges.
    ///
    /// The INVITE is found through the RAck header; the PRACK itself is
    /// then handled as a transaction of its own.
    pub(super) fn prack_received(&self, prack: &Message) {
        let rack = match prack.rack() {
            Ok(Some(rack)) => rack,
            Ok(None) => {
                debug!(call_id = %prack.call_id, "PRACK without RAck");
                return;
            }
            Err(e) => {
                debug!(call_id = %prack.call_id, error = %e, "PRACK with bad RAck");
                return;
            }
        };

        let index = self
            .table
            .bucket_index(prack.call_id.as_bytes(), rack.cseq_str.as_bytes());
        let mut bucket = self.table.lock(index);
        let Some(t) = bucket.iter_mut().find(|t| match_prack(t, prack, &rack)) else {
            debug!(call_id = %prack.call_id, rseq = rack.rseq, "PRACK matched no reliable provisional reply");
            return;
        };
        t.clear_timer(&self.timers, TimerKind::G);
        t.clear_timer(&self.timers, TimerKind::H);
        t.state = TransactionState::Proceeding;
        debug!(id = %t.id, rseq = rack.rseq, "Reliable provisional reply acknowledged");
    }

    /// ACK matched an INVITE server transaction
    fn uas_ack(&self, bucket: &mut Bucket, id: TransactionId, ack: Message) -> Option<Upcall> {
        let t = bucket.find(id)?;
        let state = t.state;
        match state {
            TransactionState::Completed => {
                t.state = TransactionState::Confirmed;
                t.clear_timer(&self.timers, TimerKind::G);
                t.clear_timer(&self.timers, TimerKind::H);
                t.reset_timer(&self.timers, TimerKind::I, self.config.timer_ticks(TimerKind::I), 0);
                debug!(id = %id, "ACK received, transaction confirmed");
                None
            }
            TransactionState::Terminated200 => {
                bucket.remove_transaction(id, &self.timers);
                debug!(id = %id, "ACK for 2xx received, transaction removed");
                Some(Upcall::Request(Some(id), ack))
            }
            // duplicate ACK, or ACK before any final reply
            _ => None,
        }
    }
}
