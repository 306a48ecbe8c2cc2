// Protocol messages between controllers and the display receiver.
//
// Two enums define the full vocabulary:
// - `ClientMessage`: sent by a controller, selected by its `command` field.
// - `ServerMessage`: sent by the receiver, selected by its `event` field.
//
// Inbound payloads arrive as already-parsed JSON values (the channel carries
// JSON objects, not typed frames), so decoding goes through
// `ClientMessage::from_payload`, which separates "unknown command" from
// "known command with bad fields". The dispatcher logs and drops both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{GameState, Role};

/// Every `command` value the receiver understands.
pub const COMMANDS: [&str; 3] = ["join", "leave", "move"];

/// Messages sent by a controller to the receiver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Ask for a slot. The name is free-form and never validated.
    Join {
        #[serde(default)]
        name: String,
    },
    /// Give up the slot held by this sender.
    Leave,
    /// Directional input; unknown directions are ignored downstream.
    Move {
        #[serde(default)]
        direct: String,
    },
}

/// Messages sent by the receiver to one controller or all of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Addressed: the sender holds a slot with this role.
    Joined { player: Role, gamestate: GameState },
    /// Addressed: the sender's last request was refused.
    Error { message: String },
    /// Broadcast: the game engine is ready for play.
    GameReady,
    /// Broadcast: the play-through ended; both slots are free again.
    EndGame { end_state: Value },
}

/// Reasons an inbound payload cannot be turned into a `ClientMessage`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("message has no command")]
    MissingCommand,
    #[error("invalid message command: {0}")]
    UnknownCommand(String),
    #[error("malformed {command} message: {source}")]
    Malformed {
        command: String,
        source: serde_json::Error,
    },
}

impl ClientMessage {
    /// Decode an inbound JSON payload.
    pub fn from_payload(payload: &Value) -> Result<Self, ProtocolError> {
        let object = payload.as_object().ok_or(ProtocolError::NotAnObject)?;
        let command = match object.get("command") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingCommand),
            Some(Value::String(command)) => command,
            Some(other) => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        if !COMMANDS.contains(&command.as_str()) {
            return Err(ProtocolError::UnknownCommand(command.clone()));
        }
        serde_json::from_value(payload.clone()).map_err(|source| ProtocolError::Malformed {
            command: command.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_join_with_name() {
        let msg = ClientMessage::from_payload(&json!({"command": "join", "name": "alice"}));
        assert_eq!(
            msg.unwrap(),
            ClientMessage::Join {
                name: "alice".into()
            }
        );
    }

    #[test]
    fn join_without_name_gets_empty_name() {
        let msg = ClientMessage::from_payload(&json!({"command": "join"})).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: String::new() });
    }

    #[test]
    fn leave_ignores_extra_fields() {
        let msg = ClientMessage::from_payload(&json!({"command": "leave", "why": "bored"}));
        assert_eq!(msg.unwrap(), ClientMessage::Leave);
    }

    #[test]
    fn decodes_move_direction() {
        let msg = ClientMessage::from_payload(&json!({"command": "move", "direct": "up"}));
        assert_eq!(
            msg.unwrap(),
            ClientMessage::Move {
                direct: "up".into()
            }
        );
    }

    #[test]
    fn unknown_command_is_reported_by_name() {
        let err = ClientMessage::from_payload(&json!({"command": "dance"})).unwrap_err();
        match err {
            ProtocolError::UnknownCommand(command) => assert_eq!(command, "dance"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn non_string_command_is_unknown() {
        let err = ClientMessage::from_payload(&json!({"command": 7})).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(ref c) if c == "7"));
    }

    #[test]
    fn missing_command_rejected() {
        let err = ClientMessage::from_payload(&json!({"name": "alice"})).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingCommand));
    }

    #[test]
    fn non_object_rejected() {
        let err = ClientMessage::from_payload(&json!(["join"])).unwrap_err();
        assert!(matches!(err, ProtocolError::NotAnObject));
    }

    #[test]
    fn wrongly_typed_field_is_malformed() {
        let err = ClientMessage::from_payload(&json!({"command": "join", "name": 5})).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { ref command, .. } if command == "join"));
    }

    #[test]
    fn joined_event_wire_shape() {
        let msg = ServerMessage::Joined {
            player: Role::X,
            gamestate: GameState::Ready,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "joined", "player": "X", "gamestate": "ready"})
        );
    }

    #[test]
    fn lifecycle_events_wire_shape() {
        assert_eq!(
            serde_json::to_value(ServerMessage::GameReady).unwrap(),
            json!({"event": "gameready"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::EndGame {
                end_state: json!({"winner": "O"})
            })
            .unwrap(),
            json!({"event": "endgame", "end_state": {"winner": "O"}})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Error {
                message: "game is full.".into()
            })
            .unwrap(),
            json!({"event": "error", "message": "game is full."})
        );
    }

    #[test]
    fn client_message_encodes_command_tag() {
        let value = serde_json::to_value(ClientMessage::Move {
            direct: "left".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"command": "move", "direct": "left"}));
    }
}
