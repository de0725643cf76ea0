pub mod api;
pub mod doctor;
pub mod health;
pub mod session;

use serde::Deserialize;
use std::time::Duration;

pub use api::CommandApi;
pub use health::LinkHealth;
pub use session::{LinkEvent, Session};

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint refused request: {0}")]
    Rejected(String),
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Streaming channel, e.g. ws://127.0.0.1:8000/ws
    pub ws_url: String,

    /// Base of the request/response routes (go-to, health).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub reconnect: ReconnectMode,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

impl LinkConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        match self.reconnect {
            ReconnectMode::Never => ReconnectPolicy::Never,
            ReconnectMode::Backoff => ReconnectPolicy::Backoff {
                initial: Duration::from_millis(self.reconnect_initial_ms),
                max: Duration::from_millis(self.reconnect_max_ms),
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectMode {
    #[default]
    Never,
    Backoff,
}

/// What the session does after the channel fails to open or drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Stay disconnected until the operator opens a new session.
    Never,
    /// Retry, doubling the wait per consecutive failure up to `max`.
    Backoff { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    /// Wait before the next attempt, `None` to give up.
    /// `failures` counts consecutive failed opens; 0 after a session that
    /// was up and then dropped.
    pub fn delay(&self, failures: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Backoff { initial, max } => {
                let shift = failures.saturating_sub(1).min(16);
                Some(initial.saturating_mul(1u32 << shift).min(max))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn never_gives_up_immediately() {
        assert_eq!(ReconnectPolicy::Never.delay(0), None);
        assert_eq!(ReconnectPolicy::Never.delay(5), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = ReconnectPolicy::Backoff { initial: ms(500), max: ms(10_000) };
        let delays: Vec<_> = (0..8).map(|f| p.delay(f).unwrap()).collect();
        assert_eq!(
            delays,
            [ms(500), ms(500), ms(1000), ms(2000), ms(4000), ms(8000), ms(10_000), ms(10_000)]
        );
        assert_eq!(p.delay(u32::MAX), Some(ms(10_000)));
    }

    #[test]
    fn config_defaults() {
        let cfg: LinkConfig = toml::from_str(r#"ws_url = "ws://rover.local:8000/ws""#).unwrap();
        assert_eq!(cfg.reconnect_policy(), ReconnectPolicy::Never);
        assert_eq!(cfg.api_base, "http://127.0.0.1:8000");

        let cfg: LinkConfig = toml::from_str(
            "ws_url = \"ws://x/ws\"\nreconnect = \"backoff\"\nreconnect_initial_ms = 100\nreconnect_max_ms = 400",
        )
        .unwrap();
        assert_eq!(cfg.reconnect_policy(), ReconnectPolicy::Backoff { initial: ms(100), max: ms(400) });
    }
}
