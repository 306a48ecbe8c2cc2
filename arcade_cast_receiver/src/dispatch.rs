// Top-level routing of inbound controller payloads.
//
// The `command` field picks exactly one of join/leave/move. Anything that
// doesn't decode (unknown command, wrong field types, not an object) is
// logged and dropped without a reply. Admission and routing refusals are
// already reported to the sender by the session, so their errors stop here.

use arcade_cast_protocol::{ClientMessage, SenderId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::ChannelGateway;
use crate::session::Session;

pub fn dispatch<G: ChannelGateway>(session: &mut Session<G>, sender: &SenderId, payload: &Value) {
    let message = match ClientMessage::from_payload(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(%sender, error = %e, "dropping inbound message");
            return;
        }
    };

    match message {
        ClientMessage::Join { name } => {
            if let Err(e) = session.join(sender, name) {
                debug!(%sender, error = %e, "join refused");
            }
        }
        ClientMessage::Leave => {
            session.leave(sender);
        }
        ClientMessage::Move { direct } => {
            if let Err(e) = session.move_player(sender, &direct) {
                debug!(%sender, error = %e, "move refused");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arcade_cast_protocol::{GameState, Role, ServerMessage};
    use serde_json::json;

    use super::*;
    use crate::engine::EngineCall;
    use crate::input::Slot;
    use crate::session::tests::Harness;

    fn id(s: &str) -> SenderId {
        SenderId::from(s)
    }

    #[test]
    fn join_leave_move_reach_the_session() {
        let mut h = Harness::new();
        dispatch(&mut h.session, &id("a"), &json!({"command": "join", "name": "alice"}));
        assert_eq!(h.session.player(Slot::A).unwrap().display_name, "alice");
        assert_eq!(
            h.gateway().sent_to("a"),
            vec![&ServerMessage::Joined {
                player: Role::X,
                gamestate: GameState::Ready
            }]
        );

        dispatch(&mut h.session, &id("a"), &json!({"command": "move", "direct": "up"}));
        assert_eq!(h.calls(), vec![EngineCall::InjectSignal { code: 38 }]);

        dispatch(&mut h.session, &id("a"), &json!({"command": "leave"}));
        assert!(h.session.is_empty());
    }

    #[test]
    fn undecodable_payloads_get_no_reply() {
        let mut h = Harness::new();
        dispatch(&mut h.session, &id("a"), &json!({"command": "join", "name": "alice"}));
        let sent_before = h.gateway().sent.len();

        for payload in [
            json!({"command": "jump"}),
            json!({"direct": "up"}),
            json!("join"),
            json!({"command": "move", "direct": 3}),
        ] {
            dispatch(&mut h.session, &id("a"), &payload);
        }

        assert_eq!(h.gateway().sent.len(), sent_before);
        assert!(h.gateway().broadcasts.is_empty());
        assert!(h.calls().is_empty());
        assert_eq!(h.session.player_count(), 1);
    }

    #[test]
    fn refusals_are_answered_by_the_session() {
        let mut h = Harness::new();
        dispatch(&mut h.session, &id("z"), &json!({"command": "join"}));
        dispatch(&mut h.session, &id("y"), &json!({"command": "move", "direct": "left"}));

        assert_eq!(
            h.gateway().sent_to("y"),
            vec![&ServerMessage::Error {
                message: "you are not playing the game.".into()
            }]
        );
    }
}
