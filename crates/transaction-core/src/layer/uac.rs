use std::net::SocketAddr;

use sigcore_sip_core::builder::{self, generate_branch, RequestBuilder, ViaSpec};
use sigcore_sip_core::{Message, Method};
use tracing::{debug, info, warn};

use super::{TransactionLayer, Upcall};
use crate::error::{Error, Result};
use crate::timer::TimerKind;
use crate::transaction::{Bucket, Transaction, TransactionId, TransactionState, TransactionType};

/// The INVITE client transaction of a dialog's request, if it got a 2xx
fn find_uac_invite<'a>(
    bucket: &'a mut Bucket,
    call_id: &[u8],
    cseq_num: &[u8],
    from_tag: &[u8],
) -> Option<&'a mut Transaction> {
    bucket.iter_mut().find(|t| {
        t.kind == TransactionType::Uac
            && t.is_invite()
            && t.state == TransactionState::Terminated200
            && t.request.cseq.num_str.as_bytes() == cseq_num
            && t.request.call_id.as_bytes() == call_id
            && t.request.from.tag.as_ref().map(|tag| tag.as_bytes()) == Some(from_tag)
    })
}

impl TransactionLayer {
    /// Sends a request and creates its client transaction.
    ///
    /// The top Via is written here, with a fresh branch. Without an
    /// explicit `destination` the request goes to the first loose-routing
    /// Route, or else to the request-URI. Nothing is created if the
    /// first send fails.
    pub fn send_request(
        &self,
        request: RequestBuilder,
        destination: Option<SocketAddr>,
    ) -> Result<TransactionId> {
        if *request.method() == Method::Ack {
            return Err(Error::InvalidRequest(
                "ACK is sent with send_ack".to_string(),
            ));
        }

        let via = ViaSpec::udp(self.local_sent_by(), generate_branch());
        let msg = request.build(&via)?;
        let dest = match destination {
            Some(dest) => dest,
            None => self.next_hop(&msg)?,
        };
        let buf = msg.as_bytes().clone();
        let invite = msg.method().is_invite();

        let index = self.table.bucket_of(&msg);
        let mut bucket = self.table.lock(index);
        self.transport.send(dest, buf.clone())?;

        let id = self.table.next_id(index);
        let t = bucket.add_transaction(id, msg, TransactionType::Uac);
        t.retr_buf = Some(buf);
        t.retr_addr = Some(dest);
        if invite {
            t.reset_timer(&self.timers, TimerKind::A, self.config.retransmit_ticks(TimerKind::A, 0), 0);
            t.reset_timer(&self.timers, TimerKind::B, self.config.timer_ticks(TimerKind::B), 0);
        } else {
            t.reset_timer(&self.timers, TimerKind::E, self.config.retransmit_ticks(TimerKind::E, 0), 0);
            t.reset_timer(&self.timers, TimerKind::F, self.config.timer_ticks(TimerKind::F), 0);
        }
        debug!(id = %id, %dest, method = %t.request.method(), "Request sent");
        Ok(id)
    }

    /// Sends an ACK for a 2xx statelessly.
    ///
    /// The ACK is recorded on the INVITE client transaction it belongs to,
    /// whose id is returned, so that retransmissions of the 2xx are
    /// answered with the same ACK.
    pub fn send_ack(
        &self,
        ack: RequestBuilder,
        destination: Option<SocketAddr>,
    ) -> Result<Option<TransactionId>> {
        if *ack.method() != Method::Ack {
            return Err(Error::InvalidRequest(format!(
                "{} is not an ACK",
                ack.method()
            )));
        }

        let via = ViaSpec::udp(self.local_sent_by(), generate_branch());
        let msg = ack.build(&via)?;
        let dest = match destination {
            Some(dest) => dest,
            None => self.next_hop(&msg)?,
        };
        let buf = msg.as_bytes().clone();

        let mut bucket = self.table.lock(self.table.bucket_of(&msg));
        self.transport.send(dest, buf.clone())?;

        let from_tag = msg.from.tag.as_ref().map(|t| t.as_bytes()).unwrap_or_default();
        let recorded = find_uac_invite(
            &mut bucket,
            msg.call_id.as_bytes(),
            msg.cseq.num_str.as_bytes(),
            from_tag,
        )
        .map(|t| {
            t.retr_buf = Some(buf);
            t.retr_addr = Some(dest);
            t.id
        });
        match recorded {
            Some(id) => debug!(id = %id, %dest, "ACK sent"),
            None => debug!(%dest, "ACK sent outside of any transaction"),
        }
        Ok(recorded)
    }

    /// Builds the ACK for a 2xx reply to an INVITE and sends it with
    /// [`send_ack`](Self::send_ack)
    pub fn send_200_ack(
        &self,
        reply: &Message,
        destination: Option<SocketAddr>,
    ) -> Result<Option<TransactionId>> {
        let is_2xx = reply.status().is_some_and(|code| (200..300).contains(&code));
        if !is_2xx || !reply.cseq.method.is_invite() {
            return Err(Error::InvalidRequest(
                "not a 2xx reply to an INVITE".to_string(),
            ));
        }
        self.send_ack(builder::ack_for_2xx(reply)?, destination)
    }

    /// Cancels a pending INVITE client transaction.
    ///
    /// Only allowed once a provisional reply has been received. The CANCEL
    /// becomes a client transaction of its own, whose id is returned.
    /// Cancelling an unknown transaction is a no-op.
    pub fn cancel(&self, id: TransactionId) -> Result<Option<TransactionId>> {
        let mut bucket = self.table.lock(id.bucket);
        let Some(t) = bucket.find(id) else {
            debug!(id = %id, "Nothing to cancel");
            return Ok(None);
        };
        if t.kind != TransactionType::Uac || !t.is_invite() {
            return Err(Error::InvalidRequest(
                "only client INVITE transactions can be cancelled".to_string(),
            ));
        }
        if t.state != TransactionState::Proceeding {
            return Err(Error::InvalidTransition {
                state: t.state,
                operation: "cancel",
            });
        }

        let cancel = builder::cancel(&t.request)?;
        let dest = t
            .retr_addr
            .ok_or_else(|| Error::NoRoute("transaction has no destination".to_string()))?;
        let buf = cancel.as_bytes().clone();
        self.transport.send(dest, buf.clone())?;

        let cancel_id = self.table.next_id(bucket.index());
        let ct = bucket.add_transaction(cancel_id, cancel, TransactionType::Uac);
        ct.retr_buf = Some(buf);
        ct.retr_addr = Some(dest);
        ct.reset_timer(&self.timers, TimerKind::E, self.config.retransmit_ticks(TimerKind::E, 0), 0);
        ct.reset_timer(&self.timers, TimerKind::F, self.config.timer_ticks(TimerKind::F), 0);
        info!(id = %id, cancel = %cancel_id, "INVITE cancelled");
        Ok(Some(cancel_id))
    }

    /// The INVITE client transaction of a dialog request that got a 2xx,
    /// identified by Call-ID, CSeq number and From-tag.
    ///
    /// `cseq_num` is the CSeq number as it appears on the wire, the same
    /// text the table hashes, so `007` and `7` are different keys.
    pub fn find_uac_transaction(&self, call_id: &str, cseq_num: &str, from_tag: &str) -> Option<TransactionId> {
        let index = self.table.bucket_index(call_id.as_bytes(), cseq_num.as_bytes());
        let mut bucket = self.table.lock(index);
        find_uac_invite(&mut bucket, call_id.as_bytes(), cseq_num.as_bytes(), from_tag.as_bytes()).map(|t| t.id)
    }

    /// Runs a client transaction's state machine for a received reply
    pub(super) fn update_uac_reply(&self, bucket: &mut Bucket, reply: Message) -> Option<Upcall> {
        let code = reply.status()?;
        let Some(t) = bucket.match_reply(&reply) else {
            if (200..300).contains(&code) && reply.cseq.method.is_invite() {
                debug!(code, "2xx matched no transaction, passing up");
                return Some(Upcall::Reply(None, reply));
            }
            debug!(code, call_id = %reply.call_id, "Reply matched no transaction");
            return None;
        };
        let id = t.id;

        if code < 200 {
            return match t.state {
                TransactionState::Calling | TransactionState::Trying | TransactionState::Proceeding => {
                    if t.state == TransactionState::Calling {
                        t.clear_timer(&self.timers, TimerKind::A);
                        t.clear_timer(&self.timers, TimerKind::B);
                    }
                    t.state = TransactionState::Proceeding;
                    t.reply_status = code;
                    Some(Upcall::Reply(Some(id), reply))
                }
                _ => None,
            };
        }

        if *t.request.method() != Method::Cancel
            && reply.to.tag.is_none()
            && !self.config.accept_final_reply_without_to_tag
        {
            debug!(id = %id, code, "Dropping final reply without To-tag");
            return None;
        }

        if t.is_invite() {
            if code >= 300 {
                self.invite_failure(t, reply)
            } else {
                self.invite_success(t, reply)
            }
        } else {
            match t.state {
                TransactionState::Trying | TransactionState::Proceeding => {
                    t.state = TransactionState::Completed;
                    t.reply_status = code;
                    t.clear_timer(&self.timers, TimerKind::E);
                    t.clear_timer(&self.timers, TimerKind::F);
                    t.reset_timer(&self.timers, TimerKind::K, self.config.timer_ticks(TimerKind::K), 0);
                    if *t.request.method() == Method::Cancel {
                        // the INVITE's own final reply tells the user the outcome
                        debug!(id = %id, code, "CANCEL completed");
                        return None;
                    }
                    Some(Upcall::Reply(Some(id), reply))
                }
                // retransmitted final reply
                _ => None,
            }
        }
    }

    /// Non-2xx final reply to an INVITE: the transaction ACKs it itself
    fn invite_failure(&self, t: &mut Transaction, reply: Message) -> Option<Upcall> {
        match t.state {
            TransactionState::Calling | TransactionState::Proceeding => {
                t.clear_timer(&self.timers, TimerKind::A);
                t.clear_timer(&self.timers, TimerKind::B);
                t.state = TransactionState::Completed;
                t.reply_status = reply.status().unwrap_or_default();
                match builder::non_2xx_ack(&t.request, &reply) {
                    Ok(ack) => {
                        t.retr_buf = Some(ack.as_bytes().clone());
                        self.retransmit(t);
                    }
                    Err(e) => {
                        warn!(id = %t.id, error = %e, "Could not build ACK");
                        t.retr_buf = None;
                    }
                }
                t.reset_timer(&self.timers, TimerKind::D, self.config.timer_ticks(TimerKind::D), 0);
                Some(Upcall::Reply(Some(t.id), reply))
            }
            TransactionState::Completed => {
                debug!(id = %t.id, "Final reply retransmission, re-sending ACK");
                self.retransmit(t);
                None
            }
            _ => None,
        }
    }

    /// 2xx to an INVITE: the transaction user sends the ACK
    fn invite_success(&self, t: &mut Transaction, reply: Message) -> Option<Upcall> {
        match t.state {
            TransactionState::Calling | TransactionState::Proceeding => {
                t.clear_timer(&self.timers, TimerKind::A);
                t.clear_timer(&self.timers, TimerKind::B);
                t.state = TransactionState::Terminated200;
                t.reply_status = reply.status().unwrap_or_default();
                // no ACK yet; the INVITE must not be re-sent
                t.retr_buf = None;
                if t.to_tag.is_none() {
                    t.to_tag = reply.to.tag.clone();
                }
                t.reset_timer(&self.timers, TimerKind::L, self.config.timer_ticks(TimerKind::L), 0);
                Some(Upcall::Reply(Some(t.id), reply))
            }
            TransactionState::Terminated200 if reply.to.tag == t.to_tag => {
                if t.retr_buf.is_some() {
                    debug!(id = %t.id, "2xx retransmission, re-sending ACK");
                    self.retransmit(t);
                    None
                } else {
                    Some(Upcall::Reply(Some(t.id), reply))
                }
            }
            TransactionState::Terminated200 => {
                debug!(id = %t.id, "2xx from another fork");
                Some(Upcall::Reply(Some(t.id), reply))
            }
            _ => None,
        }
    }
}
