//! The Herald dispatch engine.
//!
//! One [`DispatchEngine`] per side (server or client) owns the reassembly
//! table, the bounded received-message queue, the command registry, and the
//! settings store. Each simulation tick the host calls
//! [`DispatchEngine::pump`], which drains arrived segments, reassembles
//! messages, and routes completed commands through the permission gate to
//! their handlers.

pub mod engine;
pub mod handlers;
pub mod hints;
pub mod queue;

pub use engine::{COMMANDS_SECTION, DEFAULT_PREFIX, DispatchEngine};
pub use handlers::HelpCommand;
pub use queue::{QUEUE_CAPACITY, ReceivedQueue};
