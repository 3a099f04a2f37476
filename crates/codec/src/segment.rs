//! The segment codec — pure transforms between text and wire records.

use herald_core::message::{MessageFlags, MessageKind, MessageStatus};
use herald_core::wire::{DataUnit, HeaderUnit, SEGMENT_BYTES, TransportRecord};
use thiserror::Error;

/// Failures while decoding segments back into text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("segment [{start}, {end}) exceeds declared length {total}")]
    OutOfRange { start: u32, end: u32, total: u32 },

    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Encode a message's fields and text into wire records.
///
/// Produces one header unit followed by `ceil(len / 64)` data units in
/// offset order. Empty text yields exactly the header and no data units, so
/// an empty message is still observable on the far side.
pub fn encode_text(
    seq: u32,
    kind: MessageKind,
    status: MessageStatus,
    flags: MessageFlags,
    text: &str,
) -> Vec<TransportRecord> {
    let bytes = text.as_bytes();
    let mut records = Vec::with_capacity(1 + bytes.len().div_ceil(SEGMENT_BYTES));
    records.push(TransportRecord::Header(HeaderUnit {
        seq,
        kind,
        status,
        total_len: bytes.len() as u32,
        flags,
    }));
    for (index, chunk) in bytes.chunks(SEGMENT_BYTES).enumerate() {
        records.push(TransportRecord::Data(DataUnit {
            seq,
            start: (index * SEGMENT_BYTES) as u32,
            payload: chunk.to_vec(),
        }));
    }
    records
}

/// Encode a complete [`herald_core::Message`].
pub fn encode_message(message: &herald_core::Message) -> Vec<TransportRecord> {
    encode_text(
        message.seq,
        message.kind,
        message.status,
        message.flags,
        message.text().unwrap_or_default(),
    )
}

/// Decode data units into text, given the declared total length.
///
/// Segments may arrive in any order and may overlap; each is written into a
/// zeroed buffer at its declared offset. Offsets past `total_len` are
/// rejected rather than truncated.
pub fn decode_segments(segments: &[DataUnit], total_len: u32) -> Result<String, CodecError> {
    let mut buf = vec![0u8; total_len as usize];
    for segment in segments {
        let start = segment.start as usize;
        let end = start + segment.payload.len();
        if end > buf.len() {
            return Err(CodecError::OutOfRange {
                start: segment.start,
                end: end as u32,
                total: total_len,
            });
        }
        buf[start..end].copy_from_slice(&segment.payload);
    }
    String::from_utf8(buf).map_err(|e| CodecError::InvalidUtf8(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::ConnectionId;
    use herald_core::message::Message;

    fn data_units(records: &[TransportRecord]) -> Vec<DataUnit> {
        records
            .iter()
            .filter_map(|r| match r {
                TransportRecord::Data(d) => Some(d.clone()),
                TransportRecord::Header(_) => None,
            })
            .collect()
    }

    fn roundtrip(text: &str) -> String {
        let records = encode_text(
            1,
            MessageKind::ChatMessage,
            MessageStatus::None,
            MessageFlags::empty(),
            text,
        );
        decode_segments(&data_units(&records), text.len() as u32).unwrap()
    }

    #[test]
    fn roundtrip_ascii() {
        assert_eq!(roundtrip("hello world"), "hello world");
    }

    #[test]
    fn roundtrip_empty_string() {
        assert_eq!(roundtrip(""), "");
    }

    #[test]
    fn roundtrip_multibyte_utf8() {
        let text = "zażółć gęślą jaźń — こんにちは世界 🦀🦀🦀";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn roundtrip_exactly_one_segment() {
        let text = "x".repeat(64);
        assert_eq!(roundtrip(&text), text);
    }

    #[test]
    fn empty_text_is_header_only() {
        let records = encode_text(
            5,
            MessageKind::Command,
            MessageStatus::None,
            MessageFlags::empty(),
            "",
        );
        assert_eq!(records.len(), 1);
        match &records[0] {
            TransportRecord::Header(h) => {
                assert_eq!(h.seq, 5);
                assert_eq!(h.total_len, 0);
            }
            TransportRecord::Data(_) => panic!("expected header"),
        }
    }

    #[test]
    fn segment_count_and_offsets() {
        // 200 bytes → 64 + 64 + 64 + 8
        let text = "a".repeat(200);
        let records = encode_text(
            9,
            MessageKind::ChatMessage,
            MessageStatus::None,
            MessageFlags::empty(),
            &text,
        );
        let units = data_units(&records);
        assert_eq!(units.len(), 4);
        assert_eq!(
            units.iter().map(|u| u.start).collect::<Vec<_>>(),
            vec![0, 64, 128, 192]
        );
        assert_eq!(units[3].payload.len(), 8);
    }

    #[test]
    fn multibyte_char_split_across_segments_survives() {
        // 63 ASCII bytes then a 4-byte scalar straddling the 64-byte line.
        let text = format!("{}🦀 tail", "a".repeat(63));
        assert_eq!(roundtrip(&text), text);
    }

    #[test]
    fn decode_rejects_out_of_range_segment() {
        let bad = DataUnit {
            seq: 1,
            start: 60,
            payload: vec![0u8; 16],
        };
        let err = decode_segments(&[bad], 64).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { .. }));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let bad = DataUnit {
            seq: 1,
            start: 0,
            payload: vec![0xff, 0xfe],
        };
        let err = decode_segments(&[bad], 2).unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8(_)));
    }

    #[test]
    fn encode_message_uses_message_fields() {
        let msg = Message::complete(
            11,
            MessageKind::Response,
            MessageStatus::Error,
            ConnectionId(3),
            MessageFlags::WANTS_HINTS,
            "nope",
        );
        let records = encode_message(&msg);
        match &records[0] {
            TransportRecord::Header(h) => {
                assert_eq!(h.seq, 11);
                assert_eq!(h.status, MessageStatus::Error);
                assert!(h.flags.wants_hints());
                assert_eq!(h.total_len, 4);
            }
            TransportRecord::Data(_) => panic!("expected header first"),
        }
        assert_eq!(records.len(), 2);
    }
}
