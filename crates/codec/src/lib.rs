//! Segmentation and reassembly for the Herald command protocol.
//!
//! The transport only moves small fixed-size payloads, so outbound text is
//! split into 64-byte segments ([`segment`]) and inbound segments are
//! recombined per sequence id ([`reassembly`]). The codec is a pure
//! transform; the reassembly table is the only stateful piece and is owned
//! by a single dispatch engine.

pub mod reassembly;
pub mod segment;

pub use reassembly::ReassemblyTable;
pub use segment::{CodecError, decode_segments, encode_message, encode_text};
