use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProtoError;

/// Streaming messages the console pushes to the vehicle bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outbound {
    #[serde(rename = "COMMAND")]
    Command {
        command: CommandName,
        value: Option<String>,
        /// Unix milliseconds at construction.
        timestamp: i64,
    },
    #[serde(rename = "MANUAL_CONTROL")]
    ManualControl { throttle: u16, steer: u16 },
}

impl Outbound {
    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandName {
    Arm,
    Disarm,
    SetMode,
    Stop,
    Forward,
    Backward,
    Left,
    Right,
}

impl CommandName {
    pub const ALL: [CommandName; 8] = [
        CommandName::Arm,
        CommandName::Disarm,
        CommandName::SetMode,
        CommandName::Stop,
        CommandName::Forward,
        CommandName::Backward,
        CommandName::Left,
        CommandName::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Arm => "ARM",
            CommandName::Disarm => "DISARM",
            CommandName::SetMode => "SET_MODE",
            CommandName::Stop => "STOP",
            CommandName::Forward => "FORWARD",
            CommandName::Backward => "BACKWARD",
            CommandName::Left => "LEFT",
            CommandName::Right => "RIGHT",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        CommandName::ALL
            .into_iter()
            .find(|c| c.as_str() == up)
            .ok_or_else(|| ProtoError::UnknownCommand(s.to_string()))
    }
}

/// Flight modes the bridge knows how to map for a rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoverMode {
    Manual,
    Guided,
    Auto,
    Hold,
    Rtl,
    SmartRtl,
}

impl RoverMode {
    pub const ALL: [RoverMode; 6] = [
        RoverMode::Manual,
        RoverMode::Guided,
        RoverMode::Auto,
        RoverMode::Hold,
        RoverMode::Rtl,
        RoverMode::SmartRtl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoverMode::Manual => "MANUAL",
            RoverMode::Guided => "GUIDED",
            RoverMode::Auto => "AUTO",
            RoverMode::Hold => "HOLD",
            RoverMode::Rtl => "RTL",
            RoverMode::SmartRtl => "SMART_RTL",
        }
    }
}

impl fmt::Display for RoverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoverMode {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        RoverMode::ALL
            .into_iter()
            .find(|m| m.as_str() == up)
            .ok_or_else(|| ProtoError::UnknownMode(s.to_string()))
    }
}
