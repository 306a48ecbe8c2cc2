// arcade_cast_protocol: wire vocabulary between arcade controllers and the
// display receiver.
//
// Shared by the receiver (`arcade_cast_receiver`) and any controller-side
// code. Holds no session logic.
//
// Module overview:
// - `types.rs`:    `SenderId`, `Role` (X/O), `GameState` (onload/ready).
// - `message.rs`:  `ClientMessage` (tagged by `command`), `ServerMessage`
//                  (tagged by `event`), and `ProtocolError` for payloads
//                  that can't be decoded.
// - `framing.rs`:  4-byte big-endian length prefix + JSON payload, used by
//                  the receiver's TCP gateway.
//
// Messages are JSON objects on the wire so a controller written in any
// language can speak the protocol without a schema.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{ClientMessage, ProtocolError, ServerMessage};
pub use types::{GameState, Role, SenderId};
