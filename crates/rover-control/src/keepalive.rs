//! Periodic re-send of the current control pair.
//!
//! The vehicle's failsafe trips when no control message arrives within its
//! own timeout, so the pair is sent on every tick even when neutral.
//! Deadlines come from a fixed schedule; a late tick is skipped rather
//! than bunched, so the transmitter never fires twice for one period.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::info;

pub const TRANSMIT_INTERVAL_PRESETS_MS: [u64; 6] = [0, 100, 500, 1000, 2000, 5000];

#[derive(Debug)]
pub struct KeepAlive {
    timer: Option<Interval>,
}

impl KeepAlive {
    /// `period_ms == 0` builds a disabled transmitter.
    pub fn new(period_ms: u64) -> Self {
        Self { timer: schedule(period_ms) }
    }

    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(Interval::period)
    }

    pub fn is_enabled(&self) -> bool {
        self.timer.is_some()
    }

    /// Cancels the running schedule and starts a new one one period from now.
    /// Setting the current period again keeps the existing phase.
    pub fn set_period_ms(&mut self, period_ms: u64) {
        let wanted = (period_ms > 0).then(|| Duration::from_millis(period_ms));
        if wanted == self.period() {
            return;
        }
        self.timer = schedule(period_ms);
        match wanted {
            Some(p) => info!("keep-alive: every {}ms", p.as_millis()),
            None => info!("keep-alive: off"),
        }
    }

    /// Resolves at the next deadline. Never resolves while disabled, so it
    /// can sit in a `select!` unconditionally. Cancel-safe.
    pub async fn tick(&mut self) -> Instant {
        match self.timer.as_mut() {
            Some(t) => t.tick().await,
            None => std::future::pending().await,
        }
    }
}

fn schedule(period_ms: u64) -> Option<Interval> {
    if period_ms == 0 {
        return None;
    }
    let period = Duration::from_millis(period_ms);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Some(timer)
}
