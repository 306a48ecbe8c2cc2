// Outbound half of the channel gateway.
//
// The session never touches sockets: it talks to whatever implements
// `ChannelGateway`. Sends are fire-and-forget. Implementations log write
// failures themselves and rely on the inbound side to report the broken
// sender as disconnected.
//
// The TCP implementation lives in `server.rs`.

use arcade_cast_protocol::{SenderId, ServerMessage};

pub trait ChannelGateway {
    /// Deliver to one sender. Unknown senders are ignored.
    fn send(&mut self, sender: &SenderId, message: &ServerMessage);

    /// Deliver to every currently connected sender.
    fn broadcast(&mut self, message: &ServerMessage);

    /// Number of currently connected senders.
    fn sender_count(&self) -> usize;
}
