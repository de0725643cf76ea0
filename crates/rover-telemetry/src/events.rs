use std::collections::VecDeque;
use time::OffsetDateTime;

/// The console shows the last five status texts.
pub const RECENT_EVENTS_CAP: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: u64,
    pub text: String,
    /// MAVLink severity, 0 = emergency .. 7 = debug.
    pub severity: u8,
    pub received: OffsetDateTime,
}

impl EventRecord {
    pub fn severity_label(&self) -> &'static str {
        severity_label(self.severity)
    }
}

pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        0 => "EMERGENCY",
        1 => "ALERT",
        2 => "CRITICAL",
        3 => "ERROR",
        4 => "WARNING",
        5 => "NOTICE",
        6 => "INFO",
        _ => "DEBUG",
    }
}

/// Newest-first ring of status records.
#[derive(Debug, Clone, Default)]
pub struct RecentEvents {
    entries: VecDeque<EventRecord>,
    next_id: u64,
}

impl RecentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>, severity: u8, received: OffsetDateTime) -> EventRecord {
        self.next_id += 1;
        let rec = EventRecord { id: self.next_id, text: text.into(), severity, received };
        self.entries.push_front(rec.clone());
        self.entries.truncate(RECENT_EVENTS_CAP);
        rec
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
