use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::event::AppEvent;

/// Sole owner of the auto-refresh ticker.
///
/// At most one ticker task exists. Re-arming aborts the previous one
/// before spawning the next, and each arming gets its own id so a tick
/// already queued by an aborted ticker can be recognised and dropped.
#[derive(Debug, Default)]
pub struct RefreshTimer {
    armed: Option<Armed>,
    last_id: u64,
}

#[derive(Debug)]
struct Armed {
    id: u64,
    period: Duration,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current ticker and, when `enabled`, start a new one.
    /// Must be called from within a tokio runtime.
    pub fn rearm(&mut self, enabled: bool, period: Duration, tx: &UnboundedSender<AppEvent>) {
        self.cancel();
        if !enabled {
            return;
        }

        self.last_id += 1;
        let id = self.last_id;
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(AppEvent::RefreshTick { timer: id }).is_err() {
                    break;
                }
            }
        });
        debug!(timer = id, period_secs = period.as_secs(), "auto-refresh armed");
        self.armed = Some(Armed { id, period, handle });
    }

    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
            debug!(timer = armed.id, "auto-refresh cancelled");
        }
    }

    /// Whether a tick from arming `id` should trigger a refresh.
    pub fn accepts(&self, id: u64) -> bool {
        self.armed.as_ref().is_some_and(|a| a.id == id)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.armed.as_ref().map(|a| a.period)
    }

    /// Id of the current arming, if any.
    pub fn current_id(&self) -> Option<u64> {
        self.armed.as_ref().map(|a| a.id)
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
