// Session state for the display receiver.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the two player slots, the lifecycle marker, and the admission gate for the
// engine's begin-play cue. All mutation happens through methods called from
// the server's single-threaded event loop, so there is no internal locking.
//
// Key responsibilities:
// - Join/leave arbitration: fill slot A before slot B, refuse a sender that
//   already holds a slot, refuse everyone once both slots are taken.
// - Start sequencing: after every successful join, assign roles by slot
//   (A is X, B is O), poll engine readiness, tell each occupant its role, and
//   fire the begin-play cue on every start except the very first.
// - Move routing: resolve the sender to its slot and hand the direction to
//   `input::translate` for that slot's control scheme.
// - Notifications: addressed `error`/`joined` events and the broadcast
//   `gameready`/`endgame` events.
//
// Outbound traffic goes through the `ChannelGateway` the session owns; engine
// calls go through `Engine`, which swallows failures. Neither can fail a
// session operation.

use arcade_cast_protocol::{GameState, Role, SenderId, ServerMessage};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{AdmissionError, RoutingError};
use crate::gateway::ChannelGateway;
use crate::input::{self, Slot};

/// End state broadcast when `end_game_on_leave` tears the session down.
pub const PLAYER_LEFT_END_STATE: &str = "player_left";

/// A controller holding a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub sender_id: SenderId,
    pub display_name: String,
    /// Unset until the start sequence that follows the join.
    pub role: Option<Role>,
}

/// Role handed to whoever sits in `slot`.
pub fn role_for(slot: Slot) -> Role {
    match slot {
        Slot::A => Role::X,
        Slot::B => Role::O,
    }
}

/// Gate for the engine's begin-play cue.
///
/// The cue is withheld on the very first start sequence and sent on every
/// later one. Nothing resets the gate short of building a new `Session`;
/// ending a game keeps the count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Admission {
    started: bool,
    start_count: u64,
}

impl Admission {
    /// Record one start sequence. Returns true if the begin-play cue is due,
    /// i.e. an earlier start has already been recorded.
    pub fn record_start(&mut self) -> bool {
        let cue_due = self.started;
        self.started = true;
        self.start_count += 1;
        cue_due
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn start_count(&self) -> u64 {
        self.start_count
    }
}

/// Two-slot session for one display.
pub struct Session<G> {
    gateway: G,
    engine: Engine,
    slots: [Option<Player>; 2],
    state: GameState,
    admission: Admission,
    end_game_on_leave: bool,
}

impl<G: ChannelGateway> Session<G> {
    pub fn new(gateway: G, engine: Engine) -> Self {
        Self {
            gateway,
            engine,
            slots: [None, None],
            state: GameState::AwaitingPlayers,
            admission: Admission::default(),
            end_game_on_leave: false,
        }
    }

    /// When enabled, a leave (or disconnect) that frees a slot also ends the
    /// game for everyone.
    pub fn with_end_game_on_leave(mut self, enabled: bool) -> Self {
        self.end_game_on_leave = enabled;
        self
    }

    /// Seat `sender` in the first free slot and run the start sequence.
    /// Refusals are also sent back to the sender as an `error` event.
    pub fn join(&mut self, sender: &SenderId, name: String) -> Result<Slot, AdmissionError> {
        if let Some(slot) = self.slot_of(sender) {
            let role = self.slots[slot.index()]
                .as_ref()
                .and_then(|p| p.role)
                .unwrap_or_else(|| role_for(slot));
            let err = AdmissionError::AlreadyJoined(role);
            warn!(%sender, ?slot, "sender tried to join twice");
            self.send_error(sender, &err.to_string());
            return Err(err);
        }

        let Some(slot) = Slot::ALL
            .into_iter()
            .find(|s| self.slots[s.index()].is_none())
        else {
            info!(%sender, "unable to join a full game");
            let err = AdmissionError::GameFull;
            self.send_error(sender, &err.to_string());
            return Err(err);
        };

        info!(%sender, %name, ?slot, "player joined");
        self.slots[slot.index()] = Some(Player {
            sender_id: sender.clone(),
            display_name: name,
            role: None,
        });
        self.start_game();
        Ok(slot)
    }

    /// Free the slot held by `sender`. A sender holding no slot is a no-op.
    pub fn leave(&mut self, sender: &SenderId) -> Option<Slot> {
        let Some(slot) = self.slot_of(sender) else {
            debug!(%sender, "leave from a sender holding no slot");
            return None;
        };
        self.slots[slot.index()] = None;
        info!(%sender, ?slot, "player left");

        if self.end_game_on_leave {
            self.broadcast_end_game(Value::from(PLAYER_LEFT_END_STATE));
        }
        Some(slot)
    }

    /// The gateway lost `sender`. Frees its slot if it held one.
    pub fn sender_disconnected(&mut self, sender: &SenderId) -> Option<Slot> {
        self.slot_of(sender)?;
        self.leave(sender)
    }

    /// Route a directional input to the engine using the sender's slot.
    /// Unrecognized directions are ignored without an error.
    pub fn move_player(&mut self, sender: &SenderId, direct: &str) -> Result<(), RoutingError> {
        if self.is_empty() {
            debug!(%sender, "move with no players seated; ignored");
            return Ok(());
        }

        let Some(slot) = self.slot_of(sender) else {
            warn!(%sender, "move from a sender that is not playing");
            let err = RoutingError::NotPlaying;
            self.send_error(sender, &err.to_string());
            return Err(err);
        };

        match input::translate_str(slot, direct) {
            Some(code) => self.engine.inject_signal(code),
            None => debug!(%sender, direct, "unrecognized direction ignored"),
        }
        Ok(())
    }

    /// Runs after every successful join.
    fn start_game(&mut self) {
        for slot in Slot::ALL {
            if let Some(player) = self.slots[slot.index()].as_mut() {
                player.role = Some(role_for(slot));
            }
        }

        if self.engine.is_ready() && self.state < GameState::Ready {
            info!("engine ready");
            self.state = GameState::Ready;
        }

        let seated: Vec<(SenderId, Role)> = self
            .slots
            .iter()
            .flatten()
            .filter_map(|p| p.role.map(|role| (p.sender_id.clone(), role)))
            .collect();
        for (sender, role) in seated {
            let joined = ServerMessage::Joined {
                player: role,
                gamestate: self.state,
            };
            self.gateway.send(&sender, &joined);
        }

        if self.admission.record_start() {
            debug!(starts = self.admission.start_count(), "sending begin-play cue");
            self.engine.begin_play();
        } else {
            debug!("first start; begin-play cue withheld");
        }
    }

    // --- Notifications ---

    pub fn send_error(&mut self, sender: &SenderId, text: &str) {
        self.gateway.send(
            sender,
            &ServerMessage::Error {
                message: text.into(),
            },
        );
    }

    pub fn broadcast_game_ready(&mut self) {
        info!("broadcasting game ready");
        self.broadcast(&ServerMessage::GameReady);
    }

    /// Clear both slots and tell everyone the game is over.
    pub fn broadcast_end_game(&mut self, end_state: Value) {
        self.slots = [None, None];
        info!(%end_state, "game ended");
        self.broadcast(&ServerMessage::EndGame { end_state });
    }

    pub fn broadcast(&mut self, message: &ServerMessage) {
        self.gateway.broadcast(message);
    }

    // --- Queries ---

    /// Slot held by `sender`, checking A before B.
    pub fn slot_of(&self, sender: &SenderId) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| {
            self.slots[slot.index()]
                .as_ref()
                .is_some_and(|p| &p.sender_id == sender)
        })
    }

    pub fn player(&self, slot: Slot) -> Option<&Player> {
        self.slots[slot.index()].as_ref()
    }

    pub fn player_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.player_count() == 0
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }
}
