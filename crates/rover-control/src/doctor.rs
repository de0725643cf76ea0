use anyhow::Result;
use tracing::warn;

use crate::keepalive::TRANSMIT_INTERVAL_PRESETS_MS;
use crate::{ControlConfig, SafetyConfig};

pub fn check_control(cfg: &ControlConfig) -> Result<()> {
    anyhow::ensure!(
        cfg.throttle_range >= 1 && cfg.throttle_range <= 1000,
        "control.throttle_range should be 1..1000"
    );
    if !TRANSMIT_INTERVAL_PRESETS_MS.contains(&cfg.transmit_interval_ms) {
        warn!("control.transmit_interval_ms={} is not one of the console presets", cfg.transmit_interval_ms);
    }
    if cfg.transmit_interval_ms == 0 {
        warn!("keep-alive is off: the vehicle failsafe may engage while the stick is idle");
    }
    Ok(())
}

pub fn check_safety(cfg: &SafetyConfig) -> Result<()> {
    if cfg.auto_stop_threshold_cm <= 0 {
        warn!("auto-stop disabled (safety.auto_stop_threshold_cm <= 0)");
    }
    anyhow::ensure!(cfg.cooldown_ms >= 100, "safety.cooldown_ms too small");
    anyhow::ensure!(
        cfg.suppress_window_ms < cfg.cooldown_ms,
        "safety.suppress_window_ms must be shorter than the cooldown"
    );
    anyhow::ensure!(cfg.rc_takeover_delta <= 500, "safety.rc_takeover_delta out of range");
    Ok(())
}
