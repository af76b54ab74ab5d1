use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timer::{TimerKind, MAX_DELAY_TICKS};

/// RFC 3261 timer base values.
///
/// Every transaction timer is derived from these three:
/// A, E and G start at T1 and back off; B, D, F, H, J and L wait 64·T1;
/// I and K wait T4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// **T1: Round-Trip Time estimate (Default: 500 ms)**
    /// Initial retransmission interval for requests and INVITE replies.
    pub t1: Duration,

    /// **T2: Maximum retransmission interval (Default: 4 seconds)**
    /// Caps Timer E and Timer G back-off.
    pub t2: Duration,

    /// **T4: Maximum message lifetime in the network (Default: 5 seconds)**
    /// Length of Timer I and Timer K.
    pub t4: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            t4: Duration::from_secs(5),
        }
    }
}

impl TimerSettings {
    /// Initial duration of a timer kind
    pub fn duration(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::A | TimerKind::E | TimerKind::G => self.t1,
            TimerKind::I | TimerKind::K => self.t4,
            TimerKind::B
            | TimerKind::D
            | TimerKind::F
            | TimerKind::H
            | TimerKind::J
            | TimerKind::L => self.t1 * 64,
        }
    }

    /// Interval before the retransmission following `retransmits` earlier ones.
    ///
    /// Timer A doubles without bound; Timer E and Timer G are capped at T2.
    pub fn retransmit_interval(&self, kind: TimerKind, retransmits: u32) -> Duration {
        let doubled = self.t1.saturating_mul(1u32 << retransmits.min(16));
        match kind {
            TimerKind::A => doubled,
            _ => doubled.min(self.t2),
        }
    }
}

/// Configuration of a [`TransactionLayer`](crate::TransactionLayer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    pub timers: TimerSettings,

    /// Resolution of the timer wheel
    pub tick: Duration,

    /// Number of transaction table buckets
    pub bucket_count: usize,

    /// Pass up final replies whose To header has no tag.
    /// When false such replies are dropped.
    pub accept_final_reply_without_to_tag: bool,

    /// Send replies to the source port even if the request did not ask
    /// for `rport`
    pub force_rport: bool,

    /// Host written into the sent-by of generated Via headers.
    /// Defaults to the transport's local IP.
    pub local_via_host: Option<String>,

    /// Port written into the sent-by of generated Via headers.
    /// Defaults to the transport's local port.
    pub local_via_port: Option<u16>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timers: TimerSettings::default(),
            tick: Duration::from_millis(20),
            bucket_count: 1024,
            accept_final_reply_without_to_tag: true,
            force_rport: false,
            local_via_host: None,
            local_via_port: None,
        }
    }
}

impl TransactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timers(mut self, timers: TimerSettings) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_bucket_count(mut self, count: usize) -> Self {
        self.bucket_count = count.max(1);
        self
    }

    pub fn with_accept_final_reply_without_to_tag(mut self, accept: bool) -> Self {
        self.accept_final_reply_without_to_tag = accept;
        self
    }

    pub fn with_force_rport(mut self, force: bool) -> Self {
        self.force_rport = force;
        self
    }

    pub fn with_local_via(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.local_via_host = Some(host.into());
        self.local_via_port = port;
        self
    }

    /// Converts a duration to whole wheel ticks, rounding down.
    ///
    /// A duration shorter than one tick still takes one tick.
    pub fn ticks(&self, duration: Duration) -> u32 {
        let tick = self.tick.as_nanos().max(1);
        let ticks = (duration.as_nanos() / tick).max(1);
        ticks.min(MAX_DELAY_TICKS as u128) as u32
    }

    /// Initial duration of a timer kind, in ticks
    pub fn timer_ticks(&self, kind: TimerKind) -> u32 {
        self.ticks(self.timers.duration(kind))
    }

    /// Retransmission interval in ticks, see [`TimerSettings::retransmit_interval`]
    pub fn retransmit_ticks(&self, kind: TimerKind, retransmits: u32) -> u32 {
        self.ticks(self.timers.retransmit_interval(kind, retransmits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timer_ticks() {
        let config = TransactionConfig::default();
        assert_eq!(config.timer_ticks(TimerKind::A), 25);
        assert_eq!(config.timer_ticks(TimerKind::B), 1600);
        assert_eq!(config.timer_ticks(TimerKind::D), 1600);
        assert_eq!(config.timer_ticks(TimerKind::K), 250);
        assert_eq!(config.timer_ticks(TimerKind::I), 250);
        assert_eq!(config.timer_ticks(TimerKind::L), 1600);
    }

    #[test]
    fn test_retransmit_back_off() {
        let timers = TimerSettings::default();
        assert_eq!(timers.retransmit_interval(TimerKind::A, 0), Duration::from_millis(500));
        assert_eq!(timers.retransmit_interval(TimerKind::A, 4), Duration::from_secs(8));
        assert_eq!(timers.retransmit_interval(TimerKind::E, 2), Duration::from_secs(2));
        assert_eq!(timers.retransmit_interval(TimerKind::E, 5), Duration::from_secs(4));
        assert_eq!(timers.retransmit_interval(TimerKind::G, 40), Duration::from_secs(4));
    }

    #[test]
    fn test_ticks_round_down_but_never_zero() {
        let config = TransactionConfig::default();
        assert_eq!(config.ticks(Duration::from_millis(59)), 2);
        assert_eq!(config.ticks(Duration::ZERO), 1);
        assert_eq!(config.ticks(Duration::from_secs(u64::MAX)), MAX_DELAY_TICKS);
    }

    #[test]
    fn test_config_serde() {
        let config = TransactionConfig::default()
            .with_force_rport(true)
            .with_local_via("192.0.2.1", Some(5080));
        let json = serde_json::to_string(&config).unwrap();
        let back: TransactionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
