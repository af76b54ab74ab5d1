use tracing::{debug, info, trace};

use super::{TransactionLayer, Upcall};
use crate::timer::{Expired, TimerKind};
use crate::transaction::{TimerPayload, TransactionState};
use crate::user::TimeoutKind;

impl TransactionLayer {
    /// Handles a fired transaction timer.
    ///
    /// A fire for a transaction that is gone, or for a timer that was
    /// re-armed or cleared in the meantime, is ignored.
    pub fn timer_expired(&self, expired: Expired<TimerPayload>) {
        let TimerPayload {
            transaction: id,
            kind,
            retransmits,
        } = expired.payload;

        let upcall = {
            let mut bucket = self.table.lock(id.bucket);
            let Some(t) = bucket.find(id) else {
                trace!(id = %id, timer = %kind, "Timer for a removed transaction");
                return;
            };
            if !t.take_fired(kind, expired.id) {
                trace!(id = %id, timer = %kind, "Stale timer");
                return;
            }
            trace!(id = %id, timer = %kind, state = ?t.state, "Timer fired");

            match kind {
                TimerKind::A | TimerKind::E | TimerKind::G => {
                    let active = match kind {
                        TimerKind::A => t.state == TransactionState::Calling,
                        TimerKind::E => matches!(
                            t.state,
                            TransactionState::Trying | TransactionState::Proceeding
                        ),
                        _ => matches!(
                            t.state,
                            TransactionState::Completed | TransactionState::ProceedingRel
                        ),
                    };
                    if active {
                        self.retransmit(t);
                        let n = retransmits + 1;
                        let ticks = if kind == TimerKind::E && t.state == TransactionState::Proceeding {
                            self.config.ticks(self.config.timers.t2)
                        } else {
                            self.config.retransmit_ticks(kind, n)
                        };
                        t.reset_timer(&self.timers, kind, ticks, n);
                    }
                    None
                }

                TimerKind::B | TimerKind::F => {
                    let pending = matches!(
                        t.state,
                        TransactionState::Calling | TransactionState::Trying | TransactionState::Proceeding
                    );
                    if !pending {
                        return;
                    }
                    t.state = TransactionState::Terminated;
                    info!(id = %id, timer = %kind, "Transaction timed out");
                    bucket
                        .remove_transaction(id, &self.timers)
                        .map(|t| Upcall::Timeout(id, TimeoutKind::NoReply, t.request))
                }

                TimerKind::H if t.state == TransactionState::ProceedingRel => {
                    // stop re-sending the 1xx; the user may still send a final reply
                    t.clear_timer(&self.timers, TimerKind::G);
                    t.state = TransactionState::Proceeding;
                    info!(id = %id, rseq = t.last_rseq, "No PRACK received");
                    Some(Upcall::Timeout(id, TimeoutKind::NoPrack, t.request.clone()))
                }

                TimerKind::H => {
                    let waiting = matches!(
                        t.state,
                        TransactionState::Completed | TransactionState::Terminated200
                    );
                    if !waiting {
                        return;
                    }
                    t.state = TransactionState::Terminated;
                    info!(id = %id, "No ACK received");
                    bucket
                        .remove_transaction(id, &self.timers)
                        .map(|t| Upcall::Timeout(id, TimeoutKind::NoAck, t.request))
                }

                TimerKind::D | TimerKind::I | TimerKind::J | TimerKind::K | TimerKind::L => {
                    t.state = TransactionState::Terminated;
                    debug!(id = %id, timer = %kind, "Transaction terminated");
                    bucket.remove_transaction(id, &self.timers);
                    None
                }
            }
        };

        if let Some(upcall) = upcall {
            self.dispatch(upcall);
        }
    }
}
