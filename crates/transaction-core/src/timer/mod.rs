//! Transaction timers
//!
//! [`TimerWheel`] is a four level hierarchical timing wheel advanced one
//! tick at a time. Other threads arm and cancel timers through a
//! [`TimerQueue`]; their requests are applied by the ticking thread, which
//! is the only one that touches the wheel's slots. [`TimerDriver`] ticks a
//! wheel from a tokio task.

mod driver;
mod wheel;

pub use driver::TimerDriver;
pub use wheel::{less_ts, Expired, TimerId, TimerQueue, TimerWheel, MAX_DELAY_TICKS};

use std::fmt;

use serde::{Deserialize, Serialize};

/// RFC 3261 transaction timers, plus Timer L from RFC 6026
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// INVITE client: request retransmission
    A,
    /// INVITE client: transaction timeout
    B,
    /// INVITE client: wait time for reply retransmissions
    D,
    /// Non-INVITE client: request retransmission
    E,
    /// Non-INVITE client: transaction timeout
    F,
    /// INVITE server: reply retransmission
    G,
    /// INVITE server: wait time for ACK receipt
    H,
    /// INVITE server: wait time for ACK retransmissions
    I,
    /// Non-INVITE server: wait time for request retransmissions
    J,
    /// Non-INVITE client: wait time for reply retransmissions
    K,
    /// INVITE client: wait time for 2xx retransmissions
    L,
}

/// Number of timer slots per transaction
pub const TIMER_SLOTS: usize = 3;

impl TimerKind {
    /// Slot this kind occupies in a transaction.
    ///
    /// Kinds sharing a slot are never armed at the same time.
    pub fn slot(self) -> usize {
        match self {
            TimerKind::A | TimerKind::E | TimerKind::G => 0,
            TimerKind::B | TimerKind::F | TimerKind::H | TimerKind::J => 1,
            TimerKind::D | TimerKind::K | TimerKind::I | TimerKind::L => 2,
        }
    }

    /// Retransmission timers carry a counter for exponential back-off
    pub fn is_retransmission(self) -> bool {
        matches!(self, TimerKind::A | TimerKind::E | TimerKind::G)
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::A => "A",
            TimerKind::B => "B",
            TimerKind::D => "D",
            TimerKind::E => "E",
            TimerKind::F => "F",
            TimerKind::G => "G",
            TimerKind::H => "H",
            TimerKind::I => "I",
            TimerKind::J => "J",
            TimerKind::K => "K",
            TimerKind::L => "L",
        };
        write!(f, "Timer {}", name)
    }
}
