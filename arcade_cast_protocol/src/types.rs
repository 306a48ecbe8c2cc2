// Core identity and state types for the arcade cast protocol.
//
// Used by both `message.rs` (wire messages) and the receiver's session state
// machine (`arcade_cast_receiver::session`). `SenderId` is opaque: the
// channel gateway assigns it and the receiver only compares it for equality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Gateway-assigned identity of a connected controller. Stable for the
/// lifetime of that controller's connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SenderId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Symbolic marker handed to a slot's occupant when the game starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    X,
    O,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::X => f.write_str("X"),
            Role::O => f.write_str("O"),
        }
    }
}

/// Session lifecycle marker reported in `joined` events. Only ever moves
/// forward within one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameState {
    /// Waiting on the game engine to report readiness.
    #[default]
    #[serde(rename = "onload")]
    AwaitingPlayers,
    #[serde(rename = "ready")]
    Ready,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_state_uses_wire_markers() {
        assert_eq!(
            serde_json::to_string(&GameState::AwaitingPlayers).unwrap(),
            r#""onload""#
        );
        assert_eq!(
            serde_json::to_string(&GameState::Ready).unwrap(),
            r#""ready""#
        );
    }

    #[test]
    fn game_state_is_ordered_forward() {
        assert!(GameState::AwaitingPlayers < GameState::Ready);
    }

    #[test]
    fn role_display_matches_wire() {
        assert_eq!(Role::X.to_string(), "X");
        assert_eq!(serde_json::to_string(&Role::O).unwrap(), r#""O""#);
    }
}
