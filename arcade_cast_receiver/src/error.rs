// Error types for the receiver.
//
// `AdmissionError` and `RoutingError` are reported back to the offending
// sender; their `Display` text is exactly what goes out in the `error`
// event. `ConfigError` only surfaces at startup; `ClientError` belongs to
// the controller side.

use std::io;
use std::path::PathBuf;

use arcade_cast_protocol::Role;
use thiserror::Error;

/// A join request that was refused. Session state is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("already joined as {0}, cannot play against yourself.")]
    AlreadyJoined(Role),
    #[error("game is full.")]
    GameFull,
}

/// A move from a sender that holds no slot.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("you are not playing the game.")]
    NotPlaying,
}

/// Failures of the controller-side `ControllerClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
