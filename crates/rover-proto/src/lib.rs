pub mod api;
pub mod command;
pub mod telemetry;

pub use api::{ApiReply, GoToRequest};
pub use command::{CommandName, Outbound, RoverMode};
pub use telemetry::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown rover mode: {0}")]
    UnknownMode(String),
}

/// State of the streaming channel to the vehicle bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("Disconnected"),
            ConnectionState::Connected => f.write_str("Connected"),
        }
    }
}
