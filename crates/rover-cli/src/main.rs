mod operator;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use rover_control::arbiter::THROTTLE_RANGE_PRESETS;
use rover_control::keepalive::TRANSMIT_INTERVAL_PRESETS_MS;
use rover_control::{
    dispatch, doctor as control_doctor, Console, ControlConfig, Effect, KeepAlive, SafetyConfig, Stamp,
};
use rover_link::{doctor as link_doctor, CommandApi, LinkConfig, LinkEvent, Session};
use rover_proto::api::SPEED_PRESETS_MPS;

use operator::OperatorInput;

#[derive(Debug, Parser)]
#[command(name = "rover", version, about = "Rover operator console: manual drive, telemetry and auto-stop")]
struct Cli {
    #[arg(long, default_value = "rover.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config file and probe the command endpoint.
    Doctor,
    /// Connect and drive from stdin.
    Run,
    /// Send a single go-to request.
    Goto {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Probe the command endpoint.
    Health,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkConfig,
    #[serde(default)]
    control: ControlConfig,
    #[serde(default)]
    safety: SafetyConfig,
    #[serde(default)]
    telemetry: TelemetryCfg,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct TelemetryCfg {
    /// Drop per-type telemetry when a new session comes up.
    reset_on_reconnect: bool,
    /// Status line cadence during `run`. 0 turns it off.
    status_log_every_s: u64,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self { reset_on_reconnect: false, status_log_every_s: 5 }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg).await?,
        Command::Run => run(&cfg).await?,
        Command::Goto { lat, lon, speed } => goto(&cfg, lat, lon, speed).await?,
        Command::Health => health(&cfg).await?,
    }
    Ok(())
}

async fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    check_config(cfg)?;
    if !probe_endpoint(&cfg.link).await? {
        warn!("doctor: command endpoint unreachable; go-to requests will fail until it is up");
    }
    info!("doctor: OK");
    Ok(())
}

fn check_config(cfg: &Config) -> Result<()> {
    link_doctor::check_endpoints(&cfg.link)?;
    control_doctor::check_control(&cfg.control)?;
    control_doctor::check_safety(&cfg.safety)?;
    if cfg.telemetry.reset_on_reconnect {
        info!("doctor: telemetry resets on reconnect; the trajectory trace and event log are kept");
    }
    Ok(())
}

/// `Ok(false)` when the health route cannot be reached or answers an error.
async fn probe_endpoint(link: &LinkConfig) -> Result<bool> {
    let api = CommandApi::new(link.api_base.clone(), link.request_timeout())?;
    match api.health().await {
        Ok(reply) => {
            info!("doctor: {} health {}", api.base(), reply.status);
            Ok(true)
        }
        Err(e) => {
            warn!("doctor: {} health probe failed: {}", api.base(), e);
            Ok(false)
        }
    }
}

async fn goto(cfg: &Config, lat: f64, lon: f64, speed: Option<f64>) -> Result<()> {
    let req = dispatch::go_to(lat, lon, speed)?;
    let api = CommandApi::new(cfg.link.api_base.clone(), cfg.link.request_timeout())?;
    let reply = api.go_to(&req).await.context("go-to")?;
    println!("{}: {}", reply.status, reply.message.unwrap_or_default());
    Ok(())
}

async fn health(cfg: &Config) -> Result<()> {
    let api = CommandApi::new(cfg.link.api_base.clone(), cfg.link.request_timeout())?;
    let reply = api.health().await.with_context(|| format!("health probe {}", api.base()))?;
    println!("{} {}", api.base(), reply.status);
    Ok(())
}

/// Everything `run` hands to effect execution.
struct Runtime {
    session: Session,
    api: CommandApi,
    keepalive: KeepAlive,
    goto_tx: mpsc::Sender<Result<(), String>>,
}

impl Runtime {
    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Send(msg) => {
                self.session.send(&msg);
            }
            Effect::GoTo(req) => {
                let api = self.api.clone();
                let tx = self.goto_tx.clone();
                tokio::spawn(async move {
                    let res = api.go_to(&req).await.map(|_| ()).map_err(|e| e.to_string());
                    let _ = tx.send(res).await;
                });
            }
            Effect::Notice(text) => println!("** {}", text),
            Effect::SetTransmitInterval(ms) => self.keepalive.set_period_ms(ms),
        }
    }
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let mut console = Console::new(&cfg.control, &cfg.safety)?
        .with_reset_on_reconnect(cfg.telemetry.reset_on_reconnect);

    let (goto_tx, mut goto_rx) = mpsc::channel::<Result<(), String>>(8);
    let (session, mut events) = Session::open(cfg.link.ws_url.clone(), cfg.link.reconnect_policy());
    let mut rt = Runtime {
        session,
        api: CommandApi::new(cfg.link.api_base.clone(), cfg.link.request_timeout())?,
        keepalive: KeepAlive::new(console.transmit_interval_ms()),
        goto_tx,
    };

    let status_enabled = cfg.telemetry.status_log_every_s > 0;
    let status_period = Duration::from_secs(cfg.telemetry.status_log_every_s.max(1));
    let mut status_every = tokio::time::interval(status_period);
    status_every.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        let effects = tokio::select! {
            ev = events.recv() => match ev {
                Some(LinkEvent::State(state)) => console.on_connection(state),
                Some(LinkEvent::Message(env)) => console.on_message(env, Stamp::now()),
                None => {
                    info!("run: link closed");
                    break;
                }
            },
            _ = rt.keepalive.tick() => console.on_keepalive_tick(Stamp::now()),
            line = lines.next_line(), if stdin_open => match line.context("read stdin")? {
                Some(line) => match operator::parse_line(&line) {
                    Ok(Some(OperatorInput::Quit)) => break,
                    Ok(Some(input)) => apply(&mut console, &rt, input),
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        println!("? {:#}", e);
                        Vec::new()
                    }
                },
                None => {
                    info!("run: stdin closed; still driving keep-alive until the link ends");
                    stdin_open = false;
                    Vec::new()
                }
            },
            Some(res) = goto_rx.recv() => console.on_goto_result(res),
            _ = status_every.tick(), if status_enabled => {
                info!(
                    "status: {} link={} {}",
                    console.store().snapshot(),
                    console.stats().connection,
                    console.pair()
                );
                Vec::new()
            }
            _ = tokio::signal::ctrl_c() => {
                info!("run: interrupted");
                break;
            }
        };

        for effect in effects {
            rt.execute(effect);
        }
    }

    rt.session.close();
    Ok(())
}

fn apply(console: &mut Console, rt: &Runtime, input: OperatorInput) -> Vec<Effect> {
    let now = Stamp::now();
    match input {
        OperatorInput::Command { name, value } => console.command(name, value, now).unwrap_or_else(|e| {
            println!("? {}", e);
            Vec::new()
        }),
        OperatorInput::Mode(mode) => console.set_mode(mode, now),
        OperatorInput::Drive(ev) => console.on_input(ev, now),
        OperatorInput::TransmitInterval(ms) => console.set_transmit_interval(ms),
        OperatorInput::ThrottleRange(range) => {
            match console.set_throttle_range(range) {
                Ok(()) => println!("throttle bounds {:?}", console.arbiter().throttle_bounds()),
                Err(e) => println!("? {}", e),
            }
            Vec::new()
        }
        OperatorInput::GoTo { lat, lon, speed } => console.go_to(lat, lon, speed).unwrap_or_else(|e| {
            println!("? {}", e);
            Vec::new()
        }),
        OperatorInput::Status => {
            print_status(console, rt);
            Vec::new()
        }
        OperatorInput::Events => {
            for ev in console.store().events().iter() {
                let t = ev.received.time();
                println!(
                    "#{} {:02}:{:02}:{:02} [{}] {}",
                    ev.id,
                    t.hour(),
                    t.minute(),
                    t.second(),
                    ev.severity_label(),
                    ev.text
                );
            }
            Vec::new()
        }
        OperatorInput::Help => {
            println!("{}", operator::HELP);
            println!("tx presets (ms): {:?}", TRANSMIT_INTERVAL_PRESETS_MS);
            println!("range presets: {:?}", THROTTLE_RANGE_PRESETS);
            println!("goto speed presets (m/s): {:?}", SPEED_PRESETS_MPS);
            Vec::new()
        }
        OperatorInput::Quit => Vec::new(),
    }
}

fn print_status(console: &Console, rt: &Runtime) {
    let stats = console.stats();
    let health = rt.session.health();
    let now = std::time::Instant::now();
    let window_left = console.safety().suppressed_until().map(|t| t.saturating_duration_since(now));
    println!("vehicle   {}", console.store().snapshot());
    println!(
        "telemetry msgs={} last={:?} events={}",
        console.store().ingested(),
        stats.message_age(),
        console.store().events().len()
    );
    println!(
        "control   {} range={} tx={}ms commands={}",
        console.pair(),
        console.arbiter().range(),
        console.transmit_interval_ms(),
        stats.commands_issued
    );
    println!(
        "link      {} url={} sessions={} rx={} tx={} dropped={} bad_frames={} last_rx={:?}",
        rt.session.state(),
        rt.session.url(),
        health.sessions,
        health.messages_rx,
        health.messages_tx,
        health.dropped_sends,
        health.bad_frames,
        health.rx_age()
    );
    println!(
        "safety    threshold={}cm window_left={:?} auto_stops={} last={:?} manual sent={} withheld={}",
        console.safety().threshold_cm(),
        window_left.filter(|d| !d.is_zero()),
        stats.auto_stops,
        stats.since_auto_stop(),
        stats.manual_sent,
        stats.manual_suppressed
    );
}
