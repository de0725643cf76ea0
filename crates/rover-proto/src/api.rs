use serde::{Deserialize, Serialize};

/// Speeds offered in the map's "move here" menu, m/s.
pub const SPEED_PRESETS_MPS: [f64; 4] = [0.1, 0.5, 1.0, 1.5];

/// Body of `POST /api/command/goto`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoToRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl GoToRequest {
    pub fn new(lat: f64, lon: f64, speed: Option<f64>) -> Self {
        Self { lat, lon, speed }
    }

    /// Returns a reason when the target cannot be sent as-is.
    pub fn invalid_reason(&self) -> Option<String> {
        if !self.lat.is_finite() || self.lat.abs() > 90.0 {
            return Some(format!("latitude out of range: {}", self.lat));
        }
        if !self.lon.is_finite() || self.lon.abs() > 180.0 {
            return Some(format!("longitude out of range: {}", self.lon));
        }
        match self.speed {
            Some(s) if !s.is_finite() || s <= 0.0 => Some(format!("speed must be positive: {}", s)),
            _ => None,
        }
    }
}

/// Reply shape shared by the command endpoint's JSON routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiReply {
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn speed_omitted_when_absent() {
        let v = serde_json::to_value(GoToRequest::new(35.1, 139.2, None)).unwrap();
        assert_eq!(v, json!({"lat":35.1,"lon":139.2}));
        let v = serde_json::to_value(GoToRequest::new(35.1, 139.2, Some(0.5))).unwrap();
        assert_eq!(v["speed"], json!(0.5));
    }

    #[test]
    fn validates_coordinates_and_speed() {
        assert!(GoToRequest::new(35.0, 139.0, Some(1.0)).invalid_reason().is_none());
        assert!(GoToRequest::new(91.0, 0.0, None).invalid_reason().is_some());
        assert!(GoToRequest::new(0.0, -181.0, None).invalid_reason().is_some());
        assert!(GoToRequest::new(0.0, 0.0, Some(0.0)).invalid_reason().is_some());
        assert!(GoToRequest::new(f64::NAN, 0.0, None).invalid_reason().is_some());
    }

    #[test]
    fn reply_status() {
        let ok: ApiReply = serde_json::from_value(json!({"status":"success","target":{}})).unwrap();
        assert!(ok.is_ok());
        let err: ApiReply = serde_json::from_value(json!({"status":"error","message":"No connection"})).unwrap();
        assert!(!err.is_ok());
        assert_eq!(err.message.as_deref(), Some("No connection"));
    }
}
