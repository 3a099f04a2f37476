//! Message and connection domain types.
//!
//! A [`Message`] is the unit of meaning exchanged between peers: a client
//! command, a server-relayed command, a chat line, or a response. On the wire
//! it travels as a header unit plus zero or more 64-byte data units (see
//! [`crate::wire`]); the reassembled form carries the full text.

use serde::{Deserialize, Serialize};

/// Opaque handle identifying one connected peer.
///
/// Herald never interprets the value; the hosting game assigns it and the
/// [`crate::world::WorldView`] collaborator resolves it back to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// What a message means to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A command submitted for execution on the receiving side.
    Command,
    /// A command the server forwarded on behalf of another client.
    RelayCommand,
    /// Free-form chat text.
    ChatMessage,
    /// The outcome of an earlier command.
    Response,
}

/// Severity attached to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    None,
    Info,
    Warning,
    Error,
    /// Secondary guidance appended after an error.
    Hint,
}

/// Per-message flag bitmask, carried verbatim in the header unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageFlags {
    bits: u8,
}

impl MessageFlags {
    /// Sender wants a usage hint appended when the command fails.
    pub const WANTS_HINTS: MessageFlags = MessageFlags { bits: 0b0000_0001 };
    /// Message originated from an alternate (remote/graphical) console.
    pub const REMOTE_CONSOLE: MessageFlags = MessageFlags { bits: 0b0000_0010 };

    /// No flags set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Reconstruct from a raw bitmask. Unknown bits are preserved.
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// The raw bitmask.
    pub const fn bits(self) -> u8 {
        self.bits
    }

    pub const fn contains(self, other: MessageFlags) -> bool {
        self.bits & other.bits == other.bits
    }

    #[must_use]
    pub const fn with(self, other: MessageFlags) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    pub const fn wants_hints(self) -> bool {
        self.contains(Self::WANTS_HINTS)
    }

    pub const fn from_remote_console(self) -> bool {
        self.contains(Self::REMOTE_CONSOLE)
    }
}

/// A message exchanged between peers.
///
/// A message is either *pending* (still reassembling, `text` is `None`) or
/// *complete* (`text` is `Some` and its UTF-8 byte length equals
/// `total_len`). Pending messages exist only inside the reassembly table;
/// everything downstream of it sees complete messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Sequence id, monotonically increasing per sender connection.
    pub seq: u32,

    /// What this message means to the dispatcher.
    pub kind: MessageKind,

    /// Severity (meaningful for responses).
    pub status: MessageStatus,

    /// The connection that produced the message.
    pub sender: ConnectionId,

    /// Flag bitmask.
    pub flags: MessageFlags,

    /// Declared payload length in bytes.
    pub total_len: u32,

    /// The text payload, present only once reassembly finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Message {
    /// Create a complete message from its parts.
    pub fn complete(
        seq: u32,
        kind: MessageKind,
        status: MessageStatus,
        sender: ConnectionId,
        flags: MessageFlags,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            seq,
            kind,
            status,
            sender,
            flags,
            total_len: text.len() as u32,
            text: Some(text),
        }
    }

    /// Create a pending message from header fields; the reassembly table
    /// attaches the text once every byte arrived.
    pub fn pending(
        seq: u32,
        kind: MessageKind,
        status: MessageStatus,
        sender: ConnectionId,
        flags: MessageFlags,
        total_len: u32,
    ) -> Self {
        Self {
            seq,
            kind,
            status,
            sender,
            flags,
            total_len,
            text: None,
        }
    }

    /// Whether the payload has been fully reassembled.
    pub fn is_complete(&self) -> bool {
        self.text.is_some()
    }

    /// The text payload, if complete.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Attach the reassembled payload, completing the message.
    ///
    /// Used by the reassembly table once every declared byte arrived.
    pub fn attach_text(&mut self, text: String) {
        debug_assert_eq!(text.len() as u32, self.total_len);
        self.text = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_roundtrip_bits() {
        let flags = MessageFlags::WANTS_HINTS.with(MessageFlags::REMOTE_CONSOLE);
        assert_eq!(flags.bits(), 0b11);
        let back = MessageFlags::from_bits(flags.bits());
        assert!(back.wants_hints());
        assert!(back.from_remote_console());
    }

    #[test]
    fn empty_flags_contain_nothing() {
        let flags = MessageFlags::empty();
        assert!(!flags.wants_hints());
        assert!(!flags.from_remote_console());
    }

    #[test]
    fn complete_message_has_text() {
        let msg = Message::complete(
            7,
            MessageKind::Command,
            MessageStatus::None,
            ConnectionId(1),
            MessageFlags::empty(),
            "/help",
        );
        assert!(msg.is_complete());
        assert_eq!(msg.text(), Some("/help"));
        assert_eq!(msg.total_len, 5);
    }

    #[test]
    fn pending_message_completes_via_finish() {
        let mut msg = Message::pending(
            3,
            MessageKind::ChatMessage,
            MessageStatus::None,
            ConnectionId(2),
            MessageFlags::empty(),
            5,
        );
        assert!(!msg.is_complete());
        msg.attach_text("hello".into());
        assert_eq!(msg.text(), Some("hello"));
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::complete(
            1,
            MessageKind::Response,
            MessageStatus::Info,
            ConnectionId(9),
            MessageFlags::WANTS_HINTS,
            "ok",
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text(), Some("ok"));
        assert_eq!(back.status, MessageStatus::Info);
        assert!(back.flags.wants_hints());
    }
}
