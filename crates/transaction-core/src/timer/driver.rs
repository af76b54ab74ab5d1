use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::wheel::{Expired, TimerWheel};
use crate::error::{Error, Result};

/// Ticks a [`TimerWheel`] from a tokio task at a fixed interval.
///
/// Every expired timer is handed to the callback on the driver task. Ticks
/// missed while the runtime was busy are replayed in a burst so the wheel
/// clock does not drift from wall time.
#[derive(Debug)]
pub struct TimerDriver {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TimerDriver {
    pub fn spawn<T, F>(mut wheel: TimerWheel<T>, tick: Duration, mut on_expired: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(Expired<T>) + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let period = tick.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            // the first tick of an interval completes immediately
            interval.tick().await;

            debug!(tick_ms = period.as_millis() as u64, "Timer driver started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        for expired in wheel.tick() {
                            on_expired(expired);
                        }
                    }
                }
            }
            debug!(pending = wheel.len(), "Timer driver stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stops the driver and waits for its task to finish.
    ///
    /// Timers still armed are dropped without firing.
    pub async fn shutdown(self) -> Result<()> {
        if self.shutdown_tx.send(()).is_err() {
            warn!("Timer driver task already gone");
            return Err(Error::ChannelClosed);
        }
        self.handle.await.map_err(|_| Error::ChannelClosed)
    }
}
