//! World state collaborator.
//!
//! The permission gate and the dispatcher need exactly two things from the
//! surrounding game: whether a connection maps to a live entity with some
//! trust level, and a printable name for logging. Everything else about
//! entities, prefabs, and content stays on the game's side of this trait.

use crate::message::ConnectionId;

/// Trust attributes of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTrust {
    /// Admin level; anything above zero bypasses per-command permissions.
    pub admin_level: i32,

    /// Guest sessions may never execute gated commands.
    pub guest_mode: bool,
}

/// Read-only view of the game world, queried on demand.
pub trait WorldView {
    /// Resolve a connection to its trust attributes.
    ///
    /// `None` means the handle does not correspond to a live world entity;
    /// the permission gate denies such connections outright.
    fn connection_trust(&self, conn: ConnectionId) -> Option<ConnectionTrust>;

    /// Human-readable name for a connection, used only for logging and chat.
    fn display_name(&self, conn: ConnectionId) -> String;
}
