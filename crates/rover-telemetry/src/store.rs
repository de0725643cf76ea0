use std::collections::HashMap;
use std::fmt;

use rover_proto::telemetry::tags;
use rover_proto::Envelope;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::events::{EventRecord, RecentEvents};
use crate::trace::{Point, TrajectoryTrace};
use crate::view::{self, BatteryStatus, Hud};

/// What an ingested envelope meant, for callers that react to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    Position { point: Point, appended: bool },
    Status(EventRecord),
    RcChannels { throttle: Option<u16> },
    Proximity { distance_cm: f64 },
    Other,
}

#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: HashMap<String, Value>,
    trace: TrajectoryTrace,
    events: RecentEvents,
    rc_throttle: Option<u16>,
    ingested: u64,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sole write path. Unknown tags are stored verbatim.
    pub fn ingest(&mut self, env: Envelope, received: OffsetDateTime) -> Ingested {
        self.ingested += 1;
        let rc_channels = env.is_rc_channels();
        let Envelope { kind, data } = env;

        let outcome = match kind.as_str() {
            _ if rc_channels => {
                self.rc_throttle = view::rc_throttle(&data);
                Ingested::RcChannels { throttle: self.rc_throttle }
            }
            tags::STATUSTEXT => match view::status_text(&data) {
                Some(st) => {
                    info!("vehicle [{}]: {}", crate::events::severity_label(st.severity), st.text);
                    Ingested::Status(self.events.push(st.text, st.severity, received))
                }
                None => Ingested::Other,
            },
            tags::GLOBAL_POSITION_INT => match view::position(&data) {
                Some(point) => Ingested::Position { point, appended: self.trace.push(point) },
                None => Ingested::Other,
            },
            tags::TELEMETRY => match view::proximity_cm(&data) {
                Some(distance_cm) => Ingested::Proximity { distance_cm },
                None => Ingested::Other,
            },
            _ => Ingested::Other,
        };

        if !self.latest.contains_key(&kind) {
            debug!("telemetry: first {} payload", kind);
        }
        self.latest.insert(kind, data);
        outcome
    }

    pub fn latest(&self, tag: &str) -> Option<&Value> {
        self.latest.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    /// Throttle channel from the most recent RC_CHANNELS or RC_CHANNELS_RAW.
    pub fn rc_throttle(&self) -> Option<u16> {
        self.rc_throttle
    }

    pub fn trace(&self) -> &TrajectoryTrace {
        &self.trace
    }

    pub fn events(&self) -> &RecentEvents {
        &self.events
    }

    /// Adds a console-originated record to the same log status texts go to.
    pub fn record_event(
        &mut self,
        text: impl Into<String>,
        severity: u8,
        received: OffsetDateTime,
    ) -> EventRecord {
        self.events.push(text, severity, received)
    }

    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Drops the per-type values. Trace and event log are operator history and survive.
    pub fn reset(&mut self) {
        self.latest.clear();
        self.rc_throttle = None;
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        let hb = self.latest(tags::HEARTBEAT).and_then(view::heartbeat);
        VehicleSnapshot {
            armed: hb.as_ref().map(|h| h.is_armed),
            mode: hb.and_then(|h| h.mode_name),
            position: self.latest(tags::GLOBAL_POSITION_INT).and_then(view::position),
            hud: self.latest(tags::VFR_HUD).and_then(view::hud),
            battery: self.latest(tags::SYS_STATUS).and_then(view::battery),
            proximity_cm: self.latest(tags::TELEMETRY).and_then(view::proximity_cm),
            rc_throttle: self.rc_throttle,
            trace_points: self.trace.len(),
            trace_length_m: self.trace.length_m(),
        }
    }
}

/// Flattened view for status lines and displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSnapshot {
    pub armed: Option<bool>,
    pub mode: Option<String>,
    pub position: Option<Point>,
    pub hud: Option<Hud>,
    pub battery: Option<BatteryStatus>,
    pub proximity_cm: Option<f64>,
    pub rc_throttle: Option<u16>,
    pub trace_points: usize,
    pub trace_length_m: f64,
}

impl fmt::Display for VehicleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.armed {
            Some(true) => "ARMED",
            Some(false) => "DISARMED",
            None => "?",
        };
        write!(f, "{} mode={}", state, self.mode.as_deref().unwrap_or("?"))?;
        if let Some(p) = &self.position {
            write!(f, " pos={:.6},{:.6}", p.lat, p.lon)?;
        }
        if let Some(h) = &self.hud {
            write!(f, " spd={:.1}m/s ({:.1}km/h) hdg={}", h.groundspeed, h.groundspeed_kmh(), h.heading)?;
        }
        if let Some(b) = &self.battery {
            if let Some(v) = b.voltage {
                write!(f, " batt={:.2}V", v)?;
            }
            if let Some(pct) = b.remaining {
                write!(f, " {}%", pct)?;
            }
        }
        if let Some(d) = self.proximity_cm {
            write!(f, " sonar={}cm", d)?;
        }
        write!(f, " trace={}pts/{:.0}m", self.trace_points, self.trace_length_m)
    }
}
