//! Transport adapters for Herald.
//!
//! Two implementations of the core [`herald_core::Transport`] seam:
//! an in-process [`MemoryHub`] connecting any number of endpoints (tests,
//! single-process games, the demo), and a [`ChannelTransport`] duplex link
//! over tokio channels for hosts that bridge Herald onto an async runtime.

pub mod channel;
pub mod memory;

pub use channel::{ChannelTransport, channel_pair};
pub use memory::{MemoryEndpoint, MemoryHub};
