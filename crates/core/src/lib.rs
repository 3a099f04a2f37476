//! # Herald Core
//!
//! Domain types, traits, and error definitions for the Herald command
//! protocol — the command-and-chat layer of a client/server game.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator seam is defined as a trait here. Implementations live
//! in their respective crates. This enables:
//! - Swapping transports and world backends via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod command;
pub mod error;
pub mod message;
pub mod transport;
pub mod wire;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use command::{
    CommandContext, CommandHandler, CommandLine, CommandOutput, CommandRegistry, CommandSide,
    Completer, EngineSide, RegisteredCommand,
};
pub use error::{CommandError, Error, RegistryError, Result, TransportError};
pub use message::{ConnectionId, Message, MessageFlags, MessageKind, MessageStatus};
pub use transport::{InboundRecord, Transport};
pub use wire::{DataUnit, HeaderUnit, SEGMENT_BYTES, TransportRecord};
pub use world::{ConnectionTrust, WorldView};
