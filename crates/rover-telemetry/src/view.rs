//! Typed reads of individual payloads.
//!
//! The store keeps payloads as raw JSON; these helpers pick out the few
//! fields the console actually interprets. Field names follow the bridge,
//! which forwards MAVLink messages as their `to_dict()` form.

use serde::Deserialize;
use serde_json::Value;

use crate::trace::Point;

/// RC values the bridge reports for an unused or absent channel.
const RC_UNUSED: [u16; 2] = [0, u16::MAX];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub mode_name: Option<String>,
    #[serde(default)]
    pub is_armed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hud {
    #[serde(default)]
    pub groundspeed: f64,   // m/s
    #[serde(default)]
    pub heading: f64,       // degrees
    #[serde(default)]
    pub throttle: f64,      // percent
    #[serde(default)]
    pub alt: f64,           // meters
}

impl Hud {
    pub fn groundspeed_kmh(&self) -> f64 {
        self.groundspeed * 3.6
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryStatus {
    pub voltage: Option<f32>,      // Volts
    pub current: Option<f32>,      // Amps
    pub remaining: Option<u8>,     // Percent 0-100
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusText {
    #[serde(default = "default_severity")]
    pub severity: u8,
    #[serde(default)]
    pub text: String,
}

fn default_severity() -> u8 {
    6
}

#[derive(Deserialize)]
struct RawPosition {
    lat: i64,
    lon: i64,
}

#[derive(Deserialize)]
struct RawSysStatus {
    #[serde(default = "unknown_voltage")]
    voltage_battery: u16,
    #[serde(default = "unknown_signed")]
    current_battery: i32,
    #[serde(default = "unknown_signed")]
    battery_remaining: i32,
}

fn unknown_voltage() -> u16 {
    u16::MAX
}

fn unknown_signed() -> i32 {
    -1
}

pub fn heartbeat(data: &Value) -> Option<Heartbeat> {
    Heartbeat::deserialize(data).ok()
}

pub fn hud(data: &Value) -> Option<Hud> {
    Hud::deserialize(data).ok()
}

pub fn status_text(data: &Value) -> Option<StatusText> {
    StatusText::deserialize(data).ok()
}

/// GLOBAL_POSITION_INT carries degrees scaled by 1e7.
pub fn position(data: &Value) -> Option<Point> {
    let raw = RawPosition::deserialize(data).ok()?;
    Some(Point { lat: raw.lat as f64 / 1e7, lon: raw.lon as f64 / 1e7 })
}

pub fn battery(data: &Value) -> Option<BatteryStatus> {
    let status = RawSysStatus::deserialize(data).ok()?;
    let mut battery = BatteryStatus::default();
    // voltage_battery is in millivolts, convert to volts
    if status.voltage_battery != u16::MAX {
        battery.voltage = Some(status.voltage_battery as f32 / 1000.0);
    }
    // current_battery is in centiamps (0.01A), -1 means invalid
    if status.current_battery != -1 {
        battery.current = Some(status.current_battery as f32 / 100.0);
    }
    if (0..=100).contains(&status.battery_remaining) {
        battery.remaining = Some(status.battery_remaining as u8);
    }
    Some(battery)
}

/// Throttle channel of an RC_CHANNELS / RC_CHANNELS_RAW payload.
///
/// `chan3_raw` is the only field consulted; 0 and 65535 read as absent.
pub fn rc_throttle(data: &Value) -> Option<u16> {
    let raw = data.get("chan3_raw")?.as_u64()?;
    let v = u16::try_from(raw).ok()?;
    (!RC_UNUSED.contains(&v)).then_some(v)
}

/// Proximity reading of a TELEMETRY payload, centimeters.
pub fn proximity_cm(data: &Value) -> Option<f64> {
    data.get("sonar_range")?.as_f64()
}
