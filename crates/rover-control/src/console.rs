//! The console core as a single dispatch state machine.
//!
//! Every event source (transport, operator input, keep-alive timer, go-to
//! replies) is a method on [`Console`] that mutates state and returns the
//! [`Effect`]s the runtime must carry out. Nothing here touches the
//! network, so the whole arbitration can be driven from tests.

use std::time::{Duration, Instant};

use rover_proto::{CommandName, ConnectionState, Envelope, GoToRequest, Outbound, RoverMode};
use rover_telemetry::{Ingested, TelemetryStore};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::arbiter::{Arbiter, ControlPair, InputEvent};
use crate::dispatch::{self, ManualDispatch};
use crate::safety::{SafetyOverride, Verdict};
use crate::state::ConsoleStats;
use crate::{ControlConfig, ControlError, SafetyConfig};

/// MAVLink WARNING, used for console-raised records.
const SEVERITY_WARNING: u8 = 4;

/// Monotonic time for timers plus wall time for stamps shown to people.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub mono: Instant,
    pub wall: OffsetDateTime,
}

impl Stamp {
    pub fn now() -> Self {
        Self { mono: Instant::now(), wall: OffsetDateTime::now_utc() }
    }

    pub fn after(&self, d: Duration) -> Self {
        Self { mono: self.mono + d, wall: self.wall + d }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Push onto the streaming channel.
    Send(Outbound),
    /// Fire-and-forget request to the command endpoint.
    GoTo(GoToRequest),
    /// Transient message for the operator.
    Notice(String),
    /// Restart the keep-alive transmitter with this period (0 = off).
    SetTransmitInterval(u64),
}

#[derive(Debug)]
pub struct Console {
    store: TelemetryStore,
    arbiter: Arbiter,
    safety: SafetyOverride,
    stats: ConsoleStats,
    transmit_interval_ms: u64,
    reset_on_reconnect: bool,
}

impl Console {
    pub fn new(control: &ControlConfig, safety: &SafetyConfig) -> Result<Self, ControlError> {
        Ok(Self {
            store: TelemetryStore::new(),
            arbiter: Arbiter::new(control.throttle_range)?,
            safety: SafetyOverride::new(safety),
            stats: ConsoleStats::default(),
            transmit_interval_ms: control.transmit_interval_ms,
            reset_on_reconnect: false,
        })
    }

    /// Clear per-type telemetry when a new session comes up.
    pub fn with_reset_on_reconnect(mut self, reset: bool) -> Self {
        self.reset_on_reconnect = reset;
        self
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn pair(&self) -> ControlPair {
        self.arbiter.pair()
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn safety(&self) -> &SafetyOverride {
        &self.safety
    }

    pub fn stats(&self) -> &ConsoleStats {
        &self.stats
    }

    pub fn transmit_interval_ms(&self) -> u64 {
        self.transmit_interval_ms
    }

    pub fn on_connection(&mut self, state: ConnectionState) -> Vec<Effect> {
        let prev = self.stats.connection;
        self.stats.connection = state;
        if prev == state {
            return Vec::new();
        }
        match state {
            ConnectionState::Connected => {
                if self.reset_on_reconnect {
                    self.store.reset();
                }
                vec![Effect::Notice("Connected to vehicle bridge".into())]
            }
            ConnectionState::Disconnected => vec![Effect::Notice("Disconnected".into())],
        }
    }

    /// Telemetry arrival: store update, then the safety side effects.
    pub fn on_message(&mut self, env: Envelope, now: Stamp) -> Vec<Effect> {
        self.stats.last_message = Some(now.mono);
        let mut effects = Vec::new();

        match self.store.ingest(env, now.wall) {
            Ingested::RcChannels { throttle } => {
                if self.safety.on_rc_throttle(throttle, now.mono) {
                    info!(
                        "auto-stop: transmitter took control (throttle={:?}), hand-off window closed",
                        throttle
                    );
                }
            }
            Ingested::Proximity { distance_cm } => {
                let verdict = self.safety.evaluate(
                    distance_cm,
                    self.arbiter.pair(),
                    self.store.rc_throttle(),
                    now.mono,
                );
                if let Verdict::Stop { distance_cm, threshold_cm } = verdict {
                    self.auto_stop(distance_cm, threshold_cm, now, &mut effects);
                }
            }
            Ingested::Position { .. } | Ingested::Status(_) | Ingested::Other => {}
        }
        effects
    }

    fn auto_stop(&mut self, distance_cm: f64, threshold_cm: i32, now: Stamp, effects: &mut Vec<Effect>) {
        let text = format!("Auto-stop: obstacle at {}cm (threshold {}cm)", distance_cm, threshold_cm);
        warn!("{}", text);

        self.arbiter.neutralize();
        self.stats.auto_stops += 1;
        self.stats.last_auto_stop = Some(now.mono);
        self.stats.commands_issued += 1;
        self.store.record_event(text.clone(), SEVERITY_WARNING, now.wall);

        effects.push(Effect::Send(dispatch::command(CommandName::Stop, None, now.wall)));
        effects.push(Effect::Notice(text));
    }

    /// Operator manual-drive input. Sent immediately, no batching.
    pub fn on_input(&mut self, ev: InputEvent, now: Stamp) -> Vec<Effect> {
        match self.arbiter.apply(ev) {
            Some(pair) => self.send_manual(pair, now).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Keep-alive tick: re-send whatever the pair currently is.
    pub fn on_keepalive_tick(&mut self, now: Stamp) -> Vec<Effect> {
        let pair = self.arbiter.pair();
        self.send_manual(pair, now).into_iter().collect()
    }

    fn send_manual(&mut self, pair: ControlPair, now: Stamp) -> Option<Effect> {
        match dispatch::manual_control(pair, &self.safety, now.mono) {
            ManualDispatch::Send(msg) => {
                self.stats.manual_sent += 1;
                Some(Effect::Send(msg))
            }
            ManualDispatch::Suppressed => {
                self.stats.manual_suppressed += 1;
                None
            }
        }
    }

    /// Discrete command. SET_MODE must carry a valid rover mode.
    pub fn command(
        &mut self,
        name: CommandName,
        value: Option<String>,
        now: Stamp,
    ) -> Result<Vec<Effect>, ControlError> {
        if name == CommandName::SetMode {
            let mode: RoverMode = value.as_deref().ok_or(ControlError::MissingMode)?.parse()?;
            return Ok(self.set_mode(mode, now));
        }
        info!("command: {}", name);
        self.stats.commands_issued += 1;
        Ok(vec![Effect::Send(dispatch::command(name, value, now.wall))])
    }

    pub fn set_mode(&mut self, mode: RoverMode, now: Stamp) -> Vec<Effect> {
        info!("command: SET_MODE {}", mode);
        self.stats.commands_issued += 1;
        vec![Effect::Send(dispatch::set_mode(mode, now.wall))]
    }

    pub fn go_to(&mut self, lat: f64, lon: f64, speed: Option<f64>) -> Result<Vec<Effect>, ControlError> {
        let req = dispatch::go_to(lat, lon, speed)?;
        info!("go-to: lat={} lon={} speed={:?}", req.lat, req.lon, req.speed);
        Ok(vec![Effect::GoTo(req)])
    }

    /// Reply to an earlier [`Effect::GoTo`]. Failures only become a notice.
    pub fn on_goto_result(&mut self, result: Result<(), String>) -> Vec<Effect> {
        match result {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!("go-to failed: {}", e);
                vec![Effect::Notice(format!("Go-to request failed: {}", e))]
            }
        }
    }

    pub fn set_transmit_interval(&mut self, ms: u64) -> Vec<Effect> {
        if ms == self.transmit_interval_ms {
            return Vec::new();
        }
        self.transmit_interval_ms = ms;
        vec![Effect::SetTransmitInterval(ms)]
    }

    pub fn set_throttle_range(&mut self, range: u16) -> Result<(), ControlError> {
        self.arbiter.set_range(range)
    }

    pub fn set_auto_stop_threshold(&mut self, cm: i32) {
        self.safety.set_threshold_cm(cm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{DriveKey, KeyEdge};
    use rover_proto::telemetry::tags;
    use serde_json::json;

    fn console() -> Console {
        Console::new(&ControlConfig::default(), &SafetyConfig::default()).unwrap()
    }

    fn sonar(cm: u32) -> Envelope {
        Envelope::new(tags::TELEMETRY, json!({ "sonar_range": cm }))
    }

    fn rc(chan3: u16) -> Envelope {
        Envelope::new(tags::RC_CHANNELS, json!({ "chan3_raw": chan3 }))
    }

    fn stops(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Send(Outbound::Command { command: CommandName::Stop, .. })))
            .count()
    }

    fn manual(effects: &[Effect]) -> Vec<(u16, u16)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(Outbound::ManualControl { throttle, steer }) => Some((*throttle, *steer)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn auto_stop_fires_once_then_cools_down() {
        let mut c = console();
        let t0 = Stamp::now();

        let first = c.on_message(sonar(55), t0);
        assert_eq!(stops(&first), 1);
        assert!(first.iter().any(|e| matches!(e, Effect::Notice(_))));
        assert!(c.safety().is_suppressed(t0.mono));

        let second = c.on_message(sonar(55), t0.after(Duration::from_millis(500)));
        assert_eq!(stops(&second), 0);
        assert_eq!(c.stats().auto_stops, 1);

        let warning = c.store().events().iter().next().unwrap();
        assert_eq!(warning.severity, SEVERITY_WARNING);
        assert!(warning.text.contains("55cm"));
    }

    #[test]
    fn no_auto_stop_while_reversing() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_input(InputEvent::Slider { axis: crate::Axis::Throttle, value: 1400 }, t0);
        for cm in [5, 30, 55] {
            assert_eq!(stops(&c.on_message(sonar(cm), t0)), 0);
        }
    }

    #[test]
    fn no_auto_stop_while_transmitter_reverses() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(rc(1300), t0);
        assert_eq!(stops(&c.on_message(sonar(20), t0)), 0);
    }

    #[test]
    fn manual_control_dropped_during_window_then_resumes() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(sonar(40), t0);

        let fwd = InputEvent::Key { key: DriveKey::Forward, edge: KeyEdge::Down };
        let inside = c.on_input(fwd, t0.after(Duration::from_millis(100)));
        assert!(inside.is_empty());
        assert_eq!(c.stats().manual_suppressed, 1);

        let again = c.on_input(InputEvent::Joystick { x: 0.0, y: 1.0 }, t0.after(Duration::from_millis(250)));
        assert_eq!(manual(&again), vec![(1750, 1500)]);
    }

    #[test]
    fn keepalive_is_suppressed_too() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(sonar(40), t0);
        assert!(c.on_keepalive_tick(t0.after(Duration::from_millis(10))).is_empty());
        assert_eq!(manual(&c.on_keepalive_tick(t0.after(Duration::from_millis(200)))), vec![(1500, 1500)]);
    }

    #[test]
    fn auto_stop_neutralizes_pair() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_input(InputEvent::Key { key: DriveKey::Forward, edge: KeyEdge::Down }, t0);
        assert_eq!(c.pair().throttle, 1750);
        c.on_message(sonar(10), t0);
        assert!(c.pair().is_neutral());
    }

    #[test]
    fn transmitter_takeover_lifts_window() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(sonar(40), t0);
        c.on_message(rc(1700), t0.after(Duration::from_millis(20)));
        let out = c.on_input(InputEvent::Neutralize, t0.after(Duration::from_millis(30)));
        assert_eq!(manual(&out), vec![(1500, 1500)]);
    }

    #[test]
    fn reverse_stick_takeover_lifts_window() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(sonar(40), t0);
        assert!(c.on_input(InputEvent::Neutralize, t0.after(Duration::from_millis(10))).is_empty());

        c.on_message(rc(1300), t0.after(Duration::from_millis(20)));
        assert!(!c.safety().is_suppressed(t0.after(Duration::from_millis(30)).mono));
        let fwd = InputEvent::Key { key: DriveKey::Forward, edge: KeyEdge::Down };
        let out = c.on_input(fwd, t0.after(Duration::from_millis(30)));
        assert_eq!(manual(&out), vec![(1750, 1500)]);
    }

    #[test]
    fn stop_counts_as_issued_even_when_offline() {
        let mut c = console();
        assert_eq!(c.stats().connection, ConnectionState::Disconnected);
        c.on_message(sonar(40), Stamp::now());
        assert_eq!(c.stats().commands_issued, 1);
    }

    #[test]
    fn keepalive_sends_neutral_repeatedly() {
        let mut c = console();
        let t0 = Stamp::now();
        for i in 0..3 {
            let out = c.on_keepalive_tick(t0.after(Duration::from_millis(500 * i)));
            assert_eq!(manual(&out), vec![(1500, 1500)]);
        }
        assert_eq!(c.stats().manual_sent, 3);
    }

    #[test]
    fn disabled_auto_stop_never_fires() {
        let mut c = console();
        c.set_auto_stop_threshold(0);
        assert_eq!(stops(&c.on_message(sonar(1), Stamp::now())), 0);
    }

    #[test]
    fn set_mode_requires_known_mode() {
        let mut c = console();
        let now = Stamp::now();
        assert!(matches!(c.command(CommandName::SetMode, None, now), Err(ControlError::MissingMode)));
        assert!(c.command(CommandName::SetMode, Some("FLY".into()), now).is_err());
        let out = c.command(CommandName::SetMode, Some("guided".into()), now).unwrap();
        assert!(matches!(
            &out[..],
            [Effect::Send(Outbound::Command { command: CommandName::SetMode, value: Some(v), .. })] if v == "GUIDED"
        ));
    }

    #[test]
    fn commands_are_not_suppressed() {
        let mut c = console();
        let t0 = Stamp::now();
        c.on_message(sonar(40), t0);
        let out = c.command(CommandName::Disarm, None, t0).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn go_to_failure_becomes_notice() {
        let mut c = console();
        assert!(matches!(&c.go_to(35.0, 139.0, Some(1.0)).unwrap()[..], [Effect::GoTo(_)]));
        assert!(c.go_to(100.0, 0.0, None).is_err());
        assert!(c.on_goto_result(Ok(())).is_empty());
        assert!(matches!(&c.on_goto_result(Err("timeout".into()))[..], [Effect::Notice(_)]));
    }

    #[test]
    fn transmit_interval_change_is_an_effect() {
        let mut c = console();
        assert_eq!(c.set_transmit_interval(500), vec![Effect::SetTransmitInterval(500)]);
        assert!(c.set_transmit_interval(500).is_empty());
    }

    #[test]
    fn reconnect_reset_is_opt_in() {
        let mut c = console().with_reset_on_reconnect(true);
        c.on_connection(ConnectionState::Connected);
        c.on_message(Envelope::new(tags::HEARTBEAT, json!({"is_armed": true})), Stamp::now());
        c.on_connection(ConnectionState::Disconnected);
        c.on_connection(ConnectionState::Connected);
        assert!(c.store().latest(tags::HEARTBEAT).is_none());

        let mut keep = console();
        keep.on_connection(ConnectionState::Connected);
        keep.on_message(Envelope::new(tags::HEARTBEAT, json!({"is_armed": true})), Stamp::now());
        keep.on_connection(ConnectionState::Disconnected);
        keep.on_connection(ConnectionState::Connected);
        assert!(keep.store().latest(tags::HEARTBEAT).is_some());
    }
}
