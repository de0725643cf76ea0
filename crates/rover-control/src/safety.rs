use std::time::{Duration, Instant};

use crate::arbiter::{ControlPair, NEUTRAL};
use crate::SafetyConfig;

/// Minimum spacing between two firings of the same action.
#[derive(Debug)]
pub struct Cooldown {
    last: Option<Instant>,
    min_interval: Duration,
}

impl Cooldown {
    pub fn new(min_interval: Duration) -> Self {
        Self { last: None, min_interval }
    }

    pub fn ready(&self, now: Instant) -> bool {
        match self.last {
            Some(t) => now.saturating_duration_since(t) >= self.min_interval,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn last(&self) -> Option<Instant> {
        self.last
    }
}

/// Outcome of one proximity evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Disabled,
    /// Already retreating, under console or transmitter command.
    Backward,
    Clear,
    CoolingDown,
    Stop { distance_cm: f64, threshold_cm: i32 },
}

/// Auto-stop on proximity plus the short hand-off window that follows it.
#[derive(Debug)]
pub struct SafetyOverride {
    threshold_cm: i32,
    cooldown: Cooldown,
    suppress_window: Duration,
    suppress_until: Option<Instant>,
    rc_takeover_delta: u16,
}

impl SafetyOverride {
    pub fn new(cfg: &SafetyConfig) -> Self {
        Self {
            threshold_cm: cfg.auto_stop_threshold_cm,
            cooldown: Cooldown::new(Duration::from_millis(cfg.cooldown_ms)),
            suppress_window: Duration::from_millis(cfg.suppress_window_ms),
            suppress_until: None,
            rc_takeover_delta: cfg.rc_takeover_delta,
        }
    }

    pub fn threshold_cm(&self) -> i32 {
        self.threshold_cm
    }

    pub fn set_threshold_cm(&mut self, cm: i32) {
        self.threshold_cm = cm;
    }

    pub fn enabled(&self) -> bool {
        self.threshold_cm > 0
    }

    /// Runs on every proximity reading. On `Stop` the cooldown restarts and
    /// the suppression window opens; the caller issues the STOP itself.
    pub fn evaluate(
        &mut self,
        distance_cm: f64,
        local: ControlPair,
        rc_throttle: Option<u16>,
        now: Instant,
    ) -> Verdict {
        if !self.enabled() {
            return Verdict::Disabled;
        }
        let backward = local.is_reversing() || rc_throttle.is_some_and(|t| t < NEUTRAL);
        if backward {
            return Verdict::Backward;
        }
        if distance_cm > self.threshold_cm as f64 {
            return Verdict::Clear;
        }
        if !self.cooldown.ready(now) {
            return Verdict::CoolingDown;
        }

        self.cooldown.mark(now);
        self.suppress_until = Some(now + self.suppress_window);
        Verdict::Stop { distance_cm, threshold_cm: self.threshold_cm }
    }

    /// Fresh RC telemetry. Returns true when an open window was closed
    /// because the transmitter throttle left neutral.
    pub fn on_rc_throttle(&mut self, throttle: Option<u16>, now: Instant) -> bool {
        let Some(t) = throttle else { return false };
        if !self.is_suppressed(now) {
            return false;
        }
        if t.abs_diff(NEUTRAL) > self.rc_takeover_delta {
            self.suppress_until = None;
            return true;
        }
        false
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|t| now < t)
    }

    pub fn suppressed_until(&self) -> Option<Instant> {
        self.suppress_until
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.cooldown.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(threshold: i32) -> SafetyOverride {
        SafetyOverride::new(&SafetyConfig { auto_stop_threshold_cm: threshold, ..Default::default() })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn pair(throttle: u16) -> ControlPair {
        ControlPair { throttle, steer: NEUTRAL }
    }

    #[test]
    fn fires_once_within_cooldown() {
        let mut s = engine(60);
        let t0 = Instant::now();
        assert!(matches!(s.evaluate(55.0, pair(1500), None, t0), Verdict::Stop { .. }));
        assert!(s.is_suppressed(t0));
        assert_eq!(s.evaluate(55.0, pair(1500), None, t0 + ms(500)), Verdict::CoolingDown);
        assert_eq!(s.evaluate(55.0, pair(1500), None, t0 + ms(1999)), Verdict::CoolingDown);
        assert!(matches!(s.evaluate(55.0, pair(1500), None, t0 + ms(2000)), Verdict::Stop { .. }));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut s = engine(60);
        let t0 = Instant::now();
        assert_eq!(s.evaluate(60.5, pair(1500), None, t0), Verdict::Clear);
        assert!(matches!(s.evaluate(60.0, pair(1500), None, t0), Verdict::Stop { .. }));
    }

    #[test]
    fn disabled_when_threshold_not_positive() {
        let t0 = Instant::now();
        assert_eq!(engine(0).evaluate(1.0, pair(1500), None, t0), Verdict::Disabled);
        assert_eq!(engine(-5).evaluate(1.0, pair(1500), None, t0), Verdict::Disabled);
    }

    #[test]
    fn never_stops_a_retreating_vehicle() {
        let mut s = engine(60);
        let t0 = Instant::now();
        assert_eq!(s.evaluate(5.0, pair(1400), None, t0), Verdict::Backward);
        assert_eq!(s.evaluate(5.0, pair(1500), Some(1300), t0), Verdict::Backward);
        assert!(!s.is_suppressed(t0));
        assert_eq!(s.last_trigger(), None);
    }

    #[test]
    fn window_expires_after_200ms() {
        let mut s = engine(60);
        let t0 = Instant::now();
        s.evaluate(30.0, pair(1600), Some(1500), t0);
        assert!(s.is_suppressed(t0 + ms(199)));
        assert!(!s.is_suppressed(t0 + ms(200)));
    }

    #[test]
    fn transmitter_takeover_closes_window_early() {
        let mut s = engine(60);
        let t0 = Instant::now();
        s.evaluate(30.0, pair(1500), None, t0);

        // within the dead band: stays suppressed
        assert!(!s.on_rc_throttle(Some(1540), t0 + ms(10)));
        assert!(!s.on_rc_throttle(None, t0 + ms(10)));
        assert!(s.is_suppressed(t0 + ms(20)));

        assert!(s.on_rc_throttle(Some(1551), t0 + ms(30)));
        assert!(!s.is_suppressed(t0 + ms(31)));
    }

    #[test]
    fn takeover_needs_more_than_delta_either_way() {
        let mut s = engine(60);
        let t0 = Instant::now();
        s.evaluate(30.0, pair(1500), None, t0);

        assert!(!s.on_rc_throttle(Some(1550), t0 + ms(10)));
        assert!(!s.on_rc_throttle(Some(1450), t0 + ms(20)));
        assert!(s.is_suppressed(t0 + ms(30)));
        assert_eq!(s.suppressed_until(), Some(t0 + ms(200)));

        assert!(s.on_rc_throttle(Some(1449), t0 + ms(40)));
        assert!(!s.is_suppressed(t0 + ms(41)));
        assert_eq!(s.suppressed_until(), None);
    }

    #[test]
    fn rc_without_open_window_is_noop() {
        let mut s = engine(60);
        assert!(!s.on_rc_throttle(Some(2000), Instant::now()));
    }
}
