//! Message records and send-request validation
//!
//! A message is created once at send time and mutated in exactly two bits
//! afterwards: `delivered` when it is forwarded to a live recipient, and
//! `read` when the recipient explicitly acknowledges it. Validation happens
//! before a message is ever constructed, so a rejected request leaves no
//! trace in the store.

use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;
use crate::errors::ValidationError;
use crate::time::Timestamp;
use crate::types::{ConversationKey, MessageId, MessageKind, UserId};

// ----------------------------------------------------------------------------
// Message Record
// ----------------------------------------------------------------------------

/// A single chat message within one conversation.
///
/// Invariant: `read` implies `delivered`. The only mutation paths are
/// [`Message::mark_delivered`] and [`Message::mark_read`], which preserve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: UserId,
    pub to: UserId,
    pub kind: MessageKind,
    /// Message body for text, opaque attachment reference otherwise.
    pub payload: String,
    pub timestamp: Timestamp,
    pub delivered: bool,
    pub read: bool,
}

impl Message {
    /// Construct a new undelivered, unread message.
    pub fn new(
        from: UserId,
        to: UserId,
        kind: MessageKind,
        payload: String,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            from,
            to,
            kind,
            payload,
            timestamp,
            delivered: false,
            read: false,
        }
    }

    /// The conversation this message belongs to, derived from its endpoints.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.from.clone(), self.to.clone())
    }

    /// Record a successful live forward to the recipient.
    pub fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    /// Record the recipient's explicit read acknowledgment.
    ///
    /// A read receipt proves receipt even when the message was never
    /// live-forwarded (the recipient saw it via a history fetch), so this
    /// also flips `delivered`.
    pub fn mark_read(&mut self) {
        self.delivered = true;
        self.read = true;
    }
}

// ----------------------------------------------------------------------------
// Send-Request Validation
// ----------------------------------------------------------------------------

/// Validate a send request against the configured limits.
///
/// Called before the message is constructed; a failure here mutates nothing.
pub fn validate_send(
    from: &UserId,
    to: &UserId,
    kind: MessageKind,
    payload: &str,
    config: &RelayConfig,
) -> Result<(), ValidationError> {
    if from == to {
        return Err(ValidationError::SelfAddressed { user: from.clone() });
    }

    if payload.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }

    if payload.len() > config.max_payload_bytes {
        return Err(ValidationError::PayloadTooLarge {
            size: payload.len(),
            max: config.max_payload_bytes,
        });
    }

    if payload.contains('\0') {
        return Err(ValidationError::NulByte);
    }

    // Attachment payloads are opaque references; only text gets the
    // character-level checks.
    if kind == MessageKind::Text {
        let chars = payload.chars().count();
        if chars > config.max_text_chars {
            return Err(ValidationError::TextTooLong {
                chars,
                max: config.max_text_chars,
            });
        }

        for c in payload.chars() {
            if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
                return Err(ValidationError::ControlCharacters);
            }
        }
    }

    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
