// arcade_cast_receiver: two-player session coordinator for the arcade
// display.
//
// The receiver runs on the display device. Up to two controllers connect to
// it, join the session, and get a role (X for slot A, O for slot B). Their
// directional input is translated into the game engine's native key
// signals. The receiver never runs the game; it only seats players, routes
// input, and announces lifecycle changes.
//
// Module overview:
// - `session.rs`:  Session state: the two slots, lifecycle marker, admission
//                  gate for the begin-play cue, and all notifications. The
//                  core data structure that `server.rs` drives.
// - `dispatch.rs`: Decodes an inbound payload and routes it to join, leave,
//                  or move. Undecodable payloads are logged and dropped.
// - `input.rs`:    Pure direction -> key-code mapping, one scheme per slot.
// - `engine.rs`:   `GameEngine` trait, the `Engine` capability wrapper that
//                  swallows failures, and the JSON-lines engine.
// - `gateway.rs`:  `ChannelGateway`, the outbound seam the session sends
//                  through.
// - `server.rs`:   TCP gateway, reader threads, and the single-threaded
//                  event loop that owns the `Session`.
// - `client.rs`:   Controller-side TCP client.
// - `config.rs`:   `ReceiverConfig` defaults and JSON file loading.
// - `error.rs`:    Admission/routing/config/client error types.
//
// Dependencies: `arcade_cast_protocol` for the wire types and framing.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod input;
pub mod server;
pub mod session;

pub use server::{ReceiverHandle, ShutdownReason, start_receiver};
pub use session::Session;
