//! Wire records — the units the transport actually moves.
//!
//! The underlying channel only carries small fixed-size payloads, so a
//! message crosses it as one [`HeaderUnit`] followed by zero or more
//! [`DataUnit`]s of at most [`SEGMENT_BYTES`] bytes each. Records are
//! independent: they may arrive in any order, may be duplicated, and may be
//! lost. Each record is consumed exactly once on receipt.

use serde::{Deserialize, Serialize};

use crate::message::{MessageFlags, MessageKind, MessageStatus};

/// Maximum payload bytes per data unit.
pub const SEGMENT_BYTES: usize = 64;

/// Metadata unit announcing a message and its declared length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUnit {
    /// Sequence id, monotonic per sender connection.
    pub seq: u32,

    pub kind: MessageKind,

    pub status: MessageStatus,

    /// Total payload length in bytes. Zero is valid: an empty message is
    /// announced by its header alone and carries no data units.
    pub total_len: u32,

    /// Flag bitmask (see [`MessageFlags`]).
    pub flags: MessageFlags,
}

/// One chunk of a message's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUnit {
    /// Sequence id of the owning message.
    pub seq: u32,

    /// Byte offset of this chunk within the payload.
    pub start: u32,

    /// Up to [`SEGMENT_BYTES`] payload bytes.
    pub payload: Vec<u8>,
}

impl DataUnit {
    /// Offset one past the last byte this unit covers.
    pub fn end(&self) -> u32 {
        self.start + self.payload.len() as u32
    }
}

/// A single transport record: either kind of unit, sent and destroyed
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum TransportRecord {
    Header(HeaderUnit),
    Data(DataUnit),
}

impl TransportRecord {
    /// The sequence id the record belongs to.
    pub fn seq(&self) -> u32 {
        match self {
            TransportRecord::Header(h) => h.seq,
            TransportRecord::Data(d) => d.seq,
        }
    }
}
