use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct LinkHealth {
    pub sessions: u32,
    pub consecutive_failures: u32,
    pub messages_rx: u64,
    pub messages_tx: u64,
    /// Sends refused because the channel was not connected.
    pub dropped_sends: u64,
    /// Inbound frames that did not decode as an envelope.
    pub bad_frames: u64,
    pub last_rx: Option<Instant>,
}

impl LinkHealth {
    pub fn rx_age(&self) -> Option<Duration> {
        self.last_rx.map(|t| t.elapsed())
    }

    pub(crate) fn on_open(&mut self) {
        self.sessions += 1;
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_open_failed(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    pub(crate) fn on_rx(&mut self) {
        self.messages_rx += 1;
        self.last_rx = Some(Instant::now());
    }
}
