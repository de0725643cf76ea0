//! Manual-drive arbitration.
//!
//! Keyboard, slider and joystick all feed one [`InputEvent`] stream into
//! [`Arbiter::apply`], which owns the single authoritative [`ControlPair`].
//! Last writer wins; every mapping and clamp lives here.

use std::fmt;

use crate::ControlError;

pub const NEUTRAL: u16 = 1500;
pub const PWM_MIN: u16 = 1000;
pub const PWM_MAX: u16 = 2000;
/// Steer always spans the full envelope: neutral ± 500.
const STEER_SPAN: f64 = 500.0;

pub const THROTTLE_RANGE_PRESETS: [u16; 3] = [250, 500, 1000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPair {
    pub throttle: u16,
    pub steer: u16,
}

impl ControlPair {
    pub const NEUTRAL: ControlPair = ControlPair { throttle: NEUTRAL, steer: NEUTRAL };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    pub fn is_reversing(&self) -> bool {
        self.throttle < NEUTRAL
    }
}

impl Default for ControlPair {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for ControlPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "throttle={} steer={}", self.throttle, self.steer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKey {
    Forward,
    Backward,
    Left,
    Right,
}

impl DriveKey {
    /// Arrow keys plus the E/D/S/F cluster. Anything else is not a drive key.
    pub fn from_key_name(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "e" | "E" => Some(DriveKey::Forward),
            "ArrowDown" | "d" | "D" => Some(DriveKey::Backward),
            "ArrowLeft" | "s" | "S" => Some(DriveKey::Left),
            "ArrowRight" | "f" | "F" => Some(DriveKey::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Down,
    /// Auto-repeat of a held key.
    Repeat,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Throttle,
    Steer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: DriveKey, edge: KeyEdge },
    Slider { axis: Axis, value: i32 },
    /// Normalized stick position, -1..1 on both axes, +y forward, +x right.
    Joystick { x: f64, y: f64 },
    Neutralize,
}

#[derive(Debug, Clone)]
pub struct Arbiter {
    pair: ControlPair,
    range: u16,
}

impl Arbiter {
    pub fn new(range: u16) -> Result<Self, ControlError> {
        check_range(range)?;
        Ok(Self { pair: ControlPair::NEUTRAL, range })
    }

    pub fn pair(&self) -> ControlPair {
        self.pair
    }

    pub fn range(&self) -> u16 {
        self.range
    }

    /// Throttle limits: neutral ± range, inside the PWM envelope.
    pub fn throttle_bounds(&self) -> (u16, u16) {
        (
            NEUTRAL.saturating_sub(self.range).max(PWM_MIN),
            NEUTRAL.saturating_add(self.range).min(PWM_MAX),
        )
    }

    /// Re-clamps the current throttle to the new bounds without sending.
    pub fn set_range(&mut self, range: u16) -> Result<(), ControlError> {
        check_range(range)?;
        self.range = range;
        let (lo, hi) = self.throttle_bounds();
        self.pair.throttle = self.pair.throttle.clamp(lo, hi);
        Ok(())
    }

    /// Computes the next pair. `None` means the event changes nothing and
    /// must not be transmitted (auto-repeat).
    pub fn apply(&mut self, ev: InputEvent) -> Option<ControlPair> {
        let (t_lo, t_hi) = self.throttle_bounds();
        let mut next = self.pair;

        match ev {
            InputEvent::Key { edge: KeyEdge::Repeat, .. } => return None,
            InputEvent::Key { key, edge: KeyEdge::Down } => match key {
                DriveKey::Forward => next.throttle = t_hi,
                DriveKey::Backward => next.throttle = t_lo,
                DriveKey::Left => next.steer = PWM_MIN,
                DriveKey::Right => next.steer = PWM_MAX,
            },
            InputEvent::Key { key, edge: KeyEdge::Up } => match key {
                DriveKey::Forward | DriveKey::Backward => next.throttle = NEUTRAL,
                DriveKey::Left | DriveKey::Right => next.steer = NEUTRAL,
            },
            InputEvent::Slider { axis: Axis::Throttle, value } => {
                next.throttle = clamp_i32(value, t_lo, t_hi);
            }
            InputEvent::Slider { axis: Axis::Steer, value } => {
                next.steer = clamp_i32(value, PWM_MIN, PWM_MAX);
            }
            InputEvent::Joystick { x, y } => {
                next.throttle = round_clamp(NEUTRAL as f64 + finite(y) * self.range as f64, t_lo, t_hi);
                next.steer = round_clamp(NEUTRAL as f64 + finite(x) * STEER_SPAN, PWM_MIN, PWM_MAX);
            }
            InputEvent::Neutralize => next = ControlPair::NEUTRAL,
        }

        self.pair = next;
        Some(next)
    }

    /// Used by auto-stop: the pair goes neutral without an operator event.
    pub fn neutralize(&mut self) {
        self.pair = ControlPair::NEUTRAL;
    }
}

fn check_range(range: u16) -> Result<(), ControlError> {
    if range == 0 || range > 1000 {
        return Err(ControlError::InvalidRange(range));
    }
    Ok(())
}

fn finite(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn round_clamp(v: f64, lo: u16, hi: u16) -> u16 {
    v.round().clamp(lo as f64, hi as f64) as u16
}

fn clamp_i32(v: i32, lo: u16, hi: u16) -> u16 {
    v.clamp(lo as i32, hi as i32) as u16
}
