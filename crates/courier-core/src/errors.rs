//! Error types for the Courier relay
//!
//! Validation errors are rejected synchronously before any state mutates;
//! relay errors cover the channel plumbing between sessions and the relay
//! task. Nothing in this taxonomy is fatal to the process — failures are
//! per-message and locally contained.

use crate::types::UserId;

/// Rejection of a send request before any store mutation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message payload is empty")]
    EmptyPayload,
    #[error("Message payload is {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("Text message is {chars} characters (max: {max})")]
    TextTooLong { chars: usize, max: usize },
    #[error("Message payload contains NUL bytes")]
    NulByte,
    #[error("Text message contains disallowed control characters")]
    ControlCharacters,
    #[error("User {user} addressed a message to themselves")]
    SelfAddressed { user: UserId },
}

/// Failure in the channel plumbing between a session and the relay task.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Relay channel closed: {reason}")]
    ChannelClosed { reason: String },
    #[error("Session buffer full for user {user}")]
    SessionBufferFull { user: UserId },
}

/// Unified error type for the Courier crates.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type used throughout the Courier crates.
pub type Result<T> = core::result::Result<T, CourierError>;
