//! Operator commands read from stdin during `rover run`, one per line.

use anyhow::{bail, Context, Result};
use rover_control::{Axis, DriveKey, InputEvent, KeyEdge};
use rover_proto::{CommandName, RoverMode};

pub const HELP: &str = "\
arm | disarm | stop | mode <NAME> | cmd <NAME> [value]
key <down|up|repeat> <key> | slider <throttle|steer> <value> | joy <x> <y> | neutral
tx <ms> | range <n> | goto <lat> <lon> [speed]
status | events | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Command { name: CommandName, value: Option<String> },
    Mode(RoverMode),
    Drive(InputEvent),
    TransmitInterval(u64),
    ThrottleRange(u16),
    GoTo { lat: f64, lon: f64, speed: Option<f64> },
    Status,
    Events,
    Help,
    Quit,
}

/// `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Result<Option<OperatorInput>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else { return Ok(None) };
    if verb.starts_with('#') {
        return Ok(None);
    }
    let args: Vec<&str> = words.collect();

    let input = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("arm", []) => command(CommandName::Arm, None),
        ("disarm", []) => command(CommandName::Disarm, None),
        ("stop", []) => command(CommandName::Stop, None),
        ("mode", [name]) => OperatorInput::Mode(name.parse()?),
        ("cmd", [name]) => command(name.parse()?, None),
        ("cmd", [name, value]) => command(name.parse()?, Some(value.to_string())),
        ("key", [edge, key]) => OperatorInput::Drive(InputEvent::Key {
            key: DriveKey::from_key_name(key).with_context(|| format!("not a drive key: {}", key))?,
            edge: key_edge(edge)?,
        }),
        ("slider", [axis, value]) => OperatorInput::Drive(InputEvent::Slider {
            axis: match axis.to_ascii_lowercase().as_str() {
                "throttle" => Axis::Throttle,
                "steer" => Axis::Steer,
                other => bail!("unknown slider: {}", other),
            },
            value: value.parse().context("slider value")?,
        }),
        ("joy", [x, y]) => OperatorInput::Drive(InputEvent::Joystick {
            x: x.parse().context("joystick x")?,
            y: y.parse().context("joystick y")?,
        }),
        ("neutral", []) => OperatorInput::Drive(InputEvent::Neutralize),
        ("tx", [ms]) => OperatorInput::TransmitInterval(ms.parse().context("transmit interval ms")?),
        ("range", [n]) => OperatorInput::ThrottleRange(n.parse().context("throttle range")?),
        ("goto", [lat, lon]) => goto(lat, lon, None)?,
        ("goto", [lat, lon, speed]) => goto(lat, lon, Some(speed))?,
        ("status", []) => OperatorInput::Status,
        ("events", []) => OperatorInput::Events,
        ("help" | "?", []) => OperatorInput::Help,
        ("quit" | "exit", []) => OperatorInput::Quit,
        (other, _) => bail!("unrecognized input: {} (try `help`)", other),
    };
    Ok(Some(input))
}

fn command(name: CommandName, value: Option<String>) -> OperatorInput {
    OperatorInput::Command { name, value }
}

fn key_edge(s: &str) -> Result<KeyEdge> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "down" => KeyEdge::Down,
        "up" => KeyEdge::Up,
        "repeat" => KeyEdge::Repeat,
        other => bail!("unknown key edge: {}", other),
    })
}

fn goto(lat: &str, lon: &str, speed: Option<&str>) -> Result<OperatorInput> {
    Ok(OperatorInput::GoTo {
        lat: lat.parse().context("latitude")?,
        lon: lon.parse().context("longitude")?,
        speed: speed.map(str::parse::<f64>).transpose().context("speed")?,
    })
}
