//! Error types for the Herald domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Protocol-layer failures
//! are always recovered locally — nothing here ever reaches the host loop
//! as an unhandled fault.

use thiserror::Error;

/// The top-level error type for all Herald operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Handler execution errors ---
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures while registering or resolving command handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler '{owner}' declares no trigger names")]
    NoTriggers { owner: String },

    #[error("trigger '{trigger}' is already owned by '{owner}'")]
    TriggerTaken { trigger: String, owner: String },

    #[error("no handler registered for removal")]
    UnknownHandler,
}

/// Failures raised by a command handler during execution.
///
/// These are contained per invocation: the dispatcher converts them into a
/// generic Error response and keeps processing the queue.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("execution failed: {0}")]
    Failed(String),
}

/// Failures in the transport adapter seam.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("peer {0} is not connected")]
    PeerGone(u32),

    #[error("channel closed: {0}")]
    Closed(String),
}
