use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Elapsed workout time. Always derived from wall-clock timestamps, so a
/// suspended client catches up on the next tick instead of drifting.
#[derive(Debug, Clone)]
pub struct SessionClock {
    origin: DateTime<Utc>,
    elapsed_secs: i64,
    running: bool,
}

impl SessionClock {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            elapsed_secs: 0,
            running: true,
        }
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed seconds at `now`, or the frozen reading once stopped.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.running {
            return self.elapsed_secs;
        }
        (now - self.origin).num_seconds().max(0)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> i64 {
        self.elapsed_secs = self.elapsed_at(now);
        self.elapsed_secs
    }

    /// Takes a last reading and freezes it. Later ticks change nothing.
    pub fn stop(&mut self, now: DateTime<Utc>) -> i64 {
        let elapsed = self.tick(now);
        self.running = false;
        elapsed
    }

    /// Value as of the last tick.
    pub fn elapsed_secs(&self) -> i64 {
        self.elapsed_secs
    }
}

/// A periodic task. The owner is the only one that can cancel it, and dropping
/// the ticker cancels it too.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Calls `on_tick` every `period`, first after one full period. The task
    /// ends once `on_tick` resolves to `false`.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !on_tick().await {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
