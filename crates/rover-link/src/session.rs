//! Transport session: one persistent WebSocket to the vehicle bridge.
//!
//! [`Session::open`] spawns the connection task and hands back the
//! [`LinkEvent`] stream. Sends are fire-and-forget and refused (logged,
//! counted) whenever the channel is not connected; nothing is queued
//! across a disconnect.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use rover_proto::{ConnectionState, Envelope, Outbound};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::health::LinkHealth;
use crate::ReconnectPolicy;

const EVENT_QUEUE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    State(ConnectionState),
    Message(Envelope),
}

pub struct Session {
    url: String,
    out_tx: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
    health: Arc<Mutex<LinkHealth>>,
    task: JoinHandle<()>,
}

impl Session {
    /// Starts connecting in the background. Failure shows up as a
    /// `State(Disconnected)` event, never as an error here.
    pub fn open(url: impl Into<String>, policy: ReconnectPolicy) -> (Self, mpsc::Receiver<LinkEvent>) {
        let url = url.into();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let health = Arc::new(Mutex::new(LinkHealth::default()));

        let task = tokio::spawn(run(
            url.clone(),
            policy,
            out_rx,
            events_tx,
            state_tx,
            Arc::clone(&health),
        ));

        (Self { url, out_tx, state, health, task }, events_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns true when the message was handed to the connection.
    pub fn send(&self, msg: &Outbound) -> bool {
        if !self.state().is_connected() {
            lock(&self.health).dropped_sends += 1;
            warn!("link: not connected, dropping {:?}", msg);
            return false;
        }
        let text = match msg.to_json() {
            Ok(t) => t,
            Err(e) => {
                warn!("link: could not encode {:?}: {}", msg, e);
                return false;
            }
        };
        self.out_tx.send(text).is_ok()
    }

    pub fn health(&self) -> LinkHealth {
        lock(&self.health).clone()
    }

    /// Tears the channel down. The event stream ends afterwards.
    pub fn close(self) {
        self.task.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock(h: &Mutex<LinkHealth>) -> MutexGuard<'_, LinkHealth> {
    h.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Ended {
    /// Channel dropped; the policy decides what happens next.
    Dropped(String),
    /// Owner or consumer went away.
    Shutdown,
}

async fn run(
    url: String,
    policy: ReconnectPolicy,
    mut out_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::Sender<LinkEvent>,
    state_tx: watch::Sender<ConnectionState>,
    health: Arc<Mutex<LinkHealth>>,
) {
    let mut failures = 0u32;
    // last state put on the event stream; repeats are not re-announced
    let mut reported: Option<ConnectionState> = None;

    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _resp)) => {
                failures = 0;
                lock(&health).on_open();

                // anything left from a previous session is stale
                let mut stale = 0;
                while out_rx.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!("link: discarded {} stale outbound messages", stale);
                }

                info!("link: connected to {}", url);
                state_tx.send_replace(ConnectionState::Connected);
                if events_tx.send(LinkEvent::State(ConnectionState::Connected)).await.is_err() {
                    return;
                }
                reported = Some(ConnectionState::Connected);

                let ended = pump(ws, &mut out_rx, &events_tx, &health).await;
                state_tx.send_replace(ConnectionState::Disconnected);
                match ended {
                    Ended::Shutdown => return,
                    Ended::Dropped(reason) => info!("link: disconnected ({})", reason),
                }
            }
            Err(e) => {
                failures = lock(&health).on_open_failed();
                warn!("link: connect to {} failed (failures: {}): {}", url, failures, e);
                state_tx.send_replace(ConnectionState::Disconnected);
            }
        }

        if reported != Some(ConnectionState::Disconnected) {
            if events_tx.send(LinkEvent::State(ConnectionState::Disconnected)).await.is_err() {
                return;
            }
            reported = Some(ConnectionState::Disconnected);
        }

        match policy.delay(failures) {
            Some(d) => {
                info!("link: reconnecting in {}ms", d.as_millis());
                tokio::time::sleep(d).await;
            }
            None => {
                info!("link: staying disconnected");
                return;
            }
        }
    }
}

async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    out_rx: &mut mpsc::UnboundedReceiver<String>,
    events_tx: &mpsc::Sender<LinkEvent>,
    health: &Mutex<LinkHealth>,
) -> Ended {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match Envelope::parse(text.as_str()) {
                    Ok(env) => {
                        lock(health).on_rx();
                        if events_tx.send(LinkEvent::Message(env)).await.is_err() {
                            return Ended::Shutdown;
                        }
                    }
                    Err(e) => {
                        lock(health).bad_frames += 1;
                        warn!("link: undecodable frame: {}", e);
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Ended::Dropped("closed by peer".into()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Ended::Dropped(format!("read error: {}", e)),
            },
            out = out_rx.recv() => match out {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        return Ended::Dropped(format!("write error: {}", e));
                    }
                    lock(health).messages_tx += 1;
                }
                None => {
                    let _ = sink.close().await;
                    return Ended::Shutdown;
                }
            },
        }
    }
}
