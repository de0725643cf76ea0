pub mod arbiter;
pub mod console;
pub mod dispatch;
pub mod doctor;
pub mod keepalive;
pub mod safety;
pub mod state;

use serde::Deserialize;

pub use arbiter::{Arbiter, Axis, ControlPair, DriveKey, InputEvent, KeyEdge};
pub use console::{Console, Effect, Stamp};
pub use keepalive::KeepAlive;
pub use safety::{SafetyOverride, Verdict};
pub use state::ConsoleStats;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("throttle range must be 1..=1000, got {0}")]
    InvalidRange(u16),
    #[error("invalid go-to target: {0}")]
    InvalidGoTo(String),
    #[error("SET_MODE needs a mode name")]
    MissingMode,
    #[error(transparent)]
    Proto(#[from] rover_proto::ProtoError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Keep-alive cadence. 0 turns the transmitter off.
    /// Console presets: 0, 100, 500, 1000, 2000, 5000.
    pub transmit_interval_ms: u64,

    /// Throttle swing around neutral (1500). Presets: 250, 500, 1000.
    pub throttle_range: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { transmit_interval_ms: 1000, throttle_range: 250 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Auto-stop fires at or below this distance. <= 0 disables it.
    pub auto_stop_threshold_cm: i32,

    /// Minimum gap between two auto-stops.
    pub cooldown_ms: u64,

    /// After an auto-stop, console manual control is withheld this long
    /// so a physical transmitter can take over.
    pub suppress_window_ms: u64,

    /// RC throttle further than this from neutral ends the window early.
    pub rc_takeover_delta: u16,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            auto_stop_threshold_cm: 60,
            cooldown_ms: 2000,
            suppress_window_ms: 200,
            rc_takeover_delta: 50,
        }
    }
}
