//! Core types for the Courier relay
//!
//! Newtype wrappers for the identifiers that flow through the relay, so a
//! user token, a message id, and a socket session id can never be confused
//! for one another.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// User Identifier
// ----------------------------------------------------------------------------

/// Opaque identity token for a user.
///
/// Issued by the authentication layer and trusted as-is; the relay never
/// inspects or derives anything from its contents beyond equality and
/// ordering (for [`ConversationKey`] construction).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an authenticated identity token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

// ----------------------------------------------------------------------------
// Message and Session Identifiers
// ----------------------------------------------------------------------------

/// Unique identifier for a message, generated at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random message id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing uuid (wire deserialization, tests).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one live transport session.
///
/// A user who reconnects gets a new session id, which is how a disconnect
/// arriving late from a superseded socket is told apart from a disconnect of
/// the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Message Kind
// ----------------------------------------------------------------------------

/// What the message payload carries.
///
/// `Text` payloads are the message body itself; the other kinds carry an
/// opaque attachment reference uploaded through the HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Voice,
}

impl MessageKind {
    /// Whether the payload is an attachment reference rather than a body.
    pub fn is_attachment(&self) -> bool {
        !matches!(self, MessageKind::Text)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::Voice => "voice",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Conversation Key
// ----------------------------------------------------------------------------

/// Order-independent pairing of two users identifying a message thread.
///
/// `new(a, b)` and `new(b, a)` produce the same key; the constructor sorts
/// its arguments so the key is a pure function of the unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    first: UserId,
    second: UserId,
}

impl ConversationKey {
    /// Build the key for the conversation between `a` and `b`.
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The lexicographically smaller participant.
    pub fn first(&self) -> &UserId {
        &self.first
    }

    /// The lexicographically larger participant.
    pub fn second(&self) -> &UserId {
        &self.second
    }

    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.first == user || &self.second == user
    }

    /// The participant other than `user`, if `user` is a participant at all.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.first == user {
            Some(&self.second)
        } else if &self.second == user {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.second)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
