use std::time::Instant;

use rover_proto::{CommandName, GoToRequest, Outbound, RoverMode};
use time::OffsetDateTime;
use tracing::debug;

use crate::arbiter::ControlPair;
use crate::safety::SafetyOverride;
use crate::ControlError;

/// Result of asking for a manual-control send.
#[derive(Debug, Clone, PartialEq)]
pub enum ManualDispatch {
    Send(Outbound),
    /// Inside a suppression window; dropped on purpose, never retried.
    Suppressed,
}

pub fn command(name: CommandName, value: Option<String>, at: OffsetDateTime) -> Outbound {
    Outbound::Command {
        command: name,
        value,
        timestamp: unix_ms(at),
    }
}

pub fn set_mode(mode: RoverMode, at: OffsetDateTime) -> Outbound {
    command(CommandName::SetMode, Some(mode.as_str().to_string()), at)
}

pub fn manual_control(pair: ControlPair, safety: &SafetyOverride, now: Instant) -> ManualDispatch {
    if safety.is_suppressed(now) {
        debug!(
            target: "rover_control::suppressed",
            throttle = pair.throttle,
            steer = pair.steer,
            "manual control withheld for transmitter hand-off"
        );
        return ManualDispatch::Suppressed;
    }
    ManualDispatch::Send(Outbound::ManualControl { throttle: pair.throttle, steer: pair.steer })
}

pub fn go_to(lat: f64, lon: f64, speed: Option<f64>) -> Result<GoToRequest, ControlError> {
    let req = GoToRequest::new(lat, lon, speed);
    match req.invalid_reason() {
        Some(reason) => Err(ControlError::InvalidGoTo(reason)),
        None => Ok(req),
    }
}

fn unix_ms(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
