//! Core types and conversation logic for the Courier chat relay
//!
//! This crate is pure domain logic with no I/O: identifiers, the message
//! record and its validation, the in-memory conversation store, the wire
//! frame enums, and the time-source abstraction. The relay runtime in
//! `courier-relay` owns and drives these from a single task.

pub mod config;
pub mod conversation;
pub mod errors;
pub mod frames;
pub mod message;
pub mod time;
pub mod types;

pub use config::RelayConfig;
pub use conversation::{ConversationStore, ConversationStoreStats};
pub use errors::{CourierError, RelayError, Result, ValidationError};
pub use frames::{ClientFrame, ServerFrame};
pub use message::{validate_send, Message};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
pub use types::{ConversationKey, MessageId, MessageKind, SessionId, UserId};
