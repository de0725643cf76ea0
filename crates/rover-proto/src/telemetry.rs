use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtoError;

/// Type tags the vehicle bridge pushes. Unknown tags are still accepted
/// by the store, these are just the ones something in the console reads.
pub mod tags {
    pub const HEARTBEAT: &str = "HEARTBEAT";
    pub const GLOBAL_POSITION_INT: &str = "GLOBAL_POSITION_INT";
    pub const VFR_HUD: &str = "VFR_HUD";
    pub const SYS_STATUS: &str = "SYS_STATUS";
    pub const STATUSTEXT: &str = "STATUSTEXT";
    pub const ATTITUDE: &str = "ATTITUDE";
    pub const RC_CHANNELS: &str = "RC_CHANNELS";
    pub const RC_CHANNELS_RAW: &str = "RC_CHANNELS_RAW";
    /// Proximity reading, `data.sonar_range` in centimeters.
    pub const TELEMETRY: &str = "TELEMETRY";
}

/// Inbound message as delivered by the transport: `{type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self { kind: kind.into(), data }
    }

    pub fn parse(text: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_rc_channels(&self) -> bool {
        self.kind == tags::RC_CHANNELS || self.kind == tags::RC_CHANNELS_RAW
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bridge_frame() {
        let env = Envelope::parse(r#"{"type":"VFR_HUD","data":{"groundspeed":1.5,"heading":90}}"#).unwrap();
        assert_eq!(env.kind, tags::VFR_HUD);
        assert_eq!(env.data["heading"], json!(90));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let env = Envelope::parse(r#"{"type":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(env.kind, "SOMETHING_NEW");
        assert!(env.data.is_null());
    }

    #[test]
    fn rejects_frame_without_type() {
        assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
        assert!(Envelope::parse("not json").is_err());
    }

    #[test]
    fn both_rc_tags_count_as_rc_channels() {
        assert!(Envelope::new(tags::RC_CHANNELS, Value::Null).is_rc_channels());
        assert!(Envelope::new(tags::RC_CHANNELS_RAW, Value::Null).is_rc_channels());
        assert!(!Envelope::new(tags::HEARTBEAT, Value::Null).is_rc_channels());
    }
}
