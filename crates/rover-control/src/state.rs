use std::time::{Duration, Instant};

use rover_proto::ConnectionState;

/// Counters the console keeps for status output and debugging.
#[derive(Debug, Clone, Default)]
pub struct ConsoleStats {
    pub connection: ConnectionState,
    pub manual_sent: u64,
    /// Manual-control sends dropped inside a suppression window.
    pub manual_suppressed: u64,
    /// Commands handed to the transport, delivered or not.
    pub commands_issued: u64,
    pub auto_stops: u64,
    pub last_auto_stop: Option<Instant>,
    pub last_message: Option<Instant>,
}

impl ConsoleStats {
    pub fn since_auto_stop(&self) -> Option<Duration> {
        self.last_auto_stop.map(|t| t.elapsed())
    }

    pub fn message_age(&self) -> Option<Duration> {
        self.last_message.map(|t| t.elapsed())
    }
}
