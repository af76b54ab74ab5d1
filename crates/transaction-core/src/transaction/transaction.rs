use std::net::SocketAddr;

use bytes::Bytes;
use sigcore_sip_core::{Message, Span};
use tracing::trace;

use super::{TransactionId, TransactionState, TransactionType};
use crate::timer::{TimerId, TimerKind, TimerQueue, TIMER_SLOTS};

/// What the timer wheel hands back when a transaction timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPayload {
    pub transaction: TransactionId,
    pub kind: TimerKind,
    /// Retransmissions already done, for A, E and G
    pub retransmits: u32,
}

/// A timer currently armed in one of a transaction's slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub kind: TimerKind,
    pub id: TimerId,
}

/// One client or server transaction
#[derive(Debug)]
pub struct Transaction {
    pub(crate) id: TransactionId,
    pub(crate) kind: TransactionType,
    /// The request that created the transaction
    pub(crate) request: Message,
    /// UAS: tag sent in replies; UAC: tag learned from the first 2xx
    pub(crate) to_tag: Option<Span>,
    /// Status of the last reply sent (UAS) or received (UAC), 0 if none
    pub(crate) reply_status: u16,
    pub(crate) state: TransactionState,
    /// Bytes re-sent on retransmission: the request (UAC), the last reply
    /// (UAS) or the ACK (UAC INVITE after a final reply)
    pub(crate) retr_buf: Option<Bytes>,
    pub(crate) retr_addr: Option<SocketAddr>,
    /// UAS INVITE: RSeq of the reliable provisional reply awaiting its
    /// PRACK, 0 if none
    pub(crate) last_rseq: u32,
    timers: [Option<ArmedTimer>; TIMER_SLOTS],
}

impl Transaction {
    pub fn new(id: TransactionId, kind: TransactionType, request: Message) -> Self {
        let state = TransactionState::initial(kind, request.method().is_invite());
        Self {
            id,
            kind,
            request,
            to_tag: None,
            reply_status: 0,
            state,
            retr_buf: None,
            retr_addr: None,
            last_rseq: 0,
            timers: [None; TIMER_SLOTS],
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn request(&self) -> &Message {
        &self.request
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn reply_status(&self) -> u16 {
        self.reply_status
    }

    pub fn to_tag(&self) -> Option<&Span> {
        self.to_tag.as_ref()
    }

    pub fn last_rseq(&self) -> u32 {
        self.last_rseq
    }

    pub fn is_invite(&self) -> bool {
        self.request.method().is_invite()
    }

    /// Id of the armed timer of `kind`, if any
    pub fn timer_id(&self, kind: TimerKind) -> Option<TimerId> {
        self.timers[kind.slot()]
            .filter(|armed| armed.kind == kind)
            .map(|armed| armed.id)
    }

    /// Kinds of all armed timers
    pub fn armed_timers(&self) -> Vec<TimerKind> {
        self.timers.iter().flatten().map(|armed| armed.kind).collect()
    }

    /// Arms `kind` to fire after `ticks`, cancelling whatever occupied
    /// its slot
    pub(crate) fn reset_timer(
        &mut self,
        queue: &TimerQueue<TimerPayload>,
        kind: TimerKind,
        ticks: u32,
        retransmits: u32,
    ) {
        let slot = kind.slot();
        if let Some(old) = self.timers[slot].take() {
            queue.remove(old.id);
        }
        let id = queue.insert(
            ticks,
            TimerPayload {
                transaction: self.id,
                kind,
                retransmits,
            },
        );
        trace!(id = %self.id, timer = %kind, ticks, "Timer armed");
        self.timers[slot] = Some(ArmedTimer { kind, id });
    }

    /// Cancels the timer of `kind` if it is armed
    pub(crate) fn clear_timer(&mut self, queue: &TimerQueue<TimerPayload>, kind: TimerKind) {
        let slot = kind.slot();
        if self.timers[slot].is_some_and(|armed| armed.kind == kind) {
            if let Some(armed) = self.timers[slot].take() {
                queue.remove(armed.id);
            }
        }
    }

    /// Cancels every armed timer
    pub(crate) fn reset_all_timers(&mut self, queue: &TimerQueue<TimerPayload>) {
        for armed in self.timers.iter_mut().filter_map(Option::take) {
            queue.remove(armed.id);
        }
    }

    /// Claims a fired timer.
    ///
    /// Returns false when the slot no longer holds `id`: the timer was
    /// cancelled or re-armed after it had already fired.
    pub(crate) fn take_fired(&mut self, kind: TimerKind, id: TimerId) -> bool {
        let slot = kind.slot();
        if self.timers[slot].is_some_and(|armed| armed.kind == kind && armed.id == id) {
            self.timers[slot] = None;
            true
        } else {
            false
        }
    }
}
