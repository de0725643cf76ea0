use anyhow::Result;
use tracing::warn;

use crate::{LinkConfig, ReconnectMode};

pub fn check_endpoints(cfg: &LinkConfig) -> Result<()> {
    anyhow::ensure!(
        cfg.ws_url.starts_with("ws://") || cfg.ws_url.starts_with("wss://"),
        "link.ws_url must be ws:// or wss://: {}",
        cfg.ws_url
    );
    anyhow::ensure!(
        cfg.api_base.starts_with("http://") || cfg.api_base.starts_with("https://"),
        "link.api_base must be http:// or https://: {}",
        cfg.api_base
    );
    anyhow::ensure!(cfg.request_timeout_ms >= 100, "link.request_timeout_ms too small");

    if cfg.ws_url.starts_with("ws://") && !is_loopback(&cfg.ws_url) {
        warn!("link.ws_url is plaintext to a remote host: {}", cfg.ws_url);
    }

    if cfg.reconnect == ReconnectMode::Backoff {
        anyhow::ensure!(cfg.reconnect_initial_ms > 0, "link.reconnect_initial_ms must be > 0");
        anyhow::ensure!(
            cfg.reconnect_max_ms >= cfg.reconnect_initial_ms,
            "link.reconnect_max_ms must be >= reconnect_initial_ms"
        );
    }
    Ok(())
}

fn is_loopback(url: &str) -> bool {
    let host = url.split("://").nth(1).unwrap_or("");
    host.starts_with("127.") || host.starts_with("localhost") || host.starts_with("[::1]")
}
