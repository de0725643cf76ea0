//! Live vehicle state decoded from the bridge's telemetry stream.
//!
//! [`store::TelemetryStore`] is the only write path: every inbound
//! [`rover_proto::Envelope`] goes through [`store::TelemetryStore::ingest`],
//! which keeps the latest payload per type tag and feeds the bounded
//! [`events::RecentEvents`] log and the [`trace::TrajectoryTrace`].

pub mod events;
pub mod store;
pub mod trace;
pub mod view;

pub use events::{EventRecord, RecentEvents, RECENT_EVENTS_CAP};
pub use store::{Ingested, TelemetryStore, VehicleSnapshot};
pub use trace::{Point, TrajectoryTrace};
