//! Transport seam — the boundary between Herald and the game's channel.
//!
//! Herald never talks to a socket. It hands [`TransportRecord`]s to a
//! `Transport` and drains whatever arrived since the last tick. The adapter
//! guarantees at-least a delivery attempt; the protocol core tolerates loss
//! (messages stay pending and eventually expire) and duplication (rejected
//! by the reassembly table).
//!
//! Implementations live in `herald-transport`.

use crate::error::TransportError;
use crate::message::ConnectionId;
use crate::wire::TransportRecord;

/// A record received from a peer, tagged with its origin.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub from: ConnectionId,
    pub record: TransportRecord,
}

/// Sends and receives wire records as discrete units.
///
/// Both operations are non-blocking: `drain` returns only what has already
/// arrived, consuming each record exactly once. The dispatch engine calls
/// `drain` once per tick and never polls between ticks.
pub trait Transport {
    /// Queue a record for delivery to one peer.
    fn send(&mut self, to: ConnectionId, record: TransportRecord) -> Result<(), TransportError>;

    /// Take every record that arrived since the previous drain.
    fn drain(&mut self) -> Vec<InboundRecord>;

    /// Currently connected remote peers (used for relays and broadcasts).
    fn peers(&self) -> Vec<ConnectionId>;
}
