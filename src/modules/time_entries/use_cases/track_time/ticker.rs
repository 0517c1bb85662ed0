// Elapsed-time ticker for the running timer.
//
// Publishes `Some(seconds)` while a timer runs and `None` while idle, once per
// tick. The value is recomputed from the entry's start time on every tick, so
// it cannot drift. The task ends when every receiver is dropped or the session
// that owns the timer is gone.

use crate::modules::time_entries::core::active_timer::ActiveTimer;
use crate::shared::core::clock::Clock;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::{self, MissedTickBehavior};

pub fn spawn_elapsed_ticker(
    timer: Weak<Mutex<ActiveTimer>>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
) -> watch::Receiver<Option<i64>> {
    let (sender, receiver) = watch::channel(None);
    tokio::spawn(async move {
        let mut interval = time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(timer) = timer.upgrade() else {
                break;
            };
            let elapsed = timer.lock().await.elapsed_seconds(clock.now_ms());
            if sender.send(elapsed).is_err() {
                break;
            }
        }
        tracing::debug!("elapsed ticker stopped");
    });
    receiver
}
