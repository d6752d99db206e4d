//! Wire protocol frames
//!
//! All traffic between a client session and the relay flows through these
//! two tagged enums, dispatched by a single handler on each side. The JSON
//! encoding is internally tagged (`"type"`), which is what the browser
//! clients speak.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::time::Timestamp;
use crate::types::{ConversationKey, MessageId, MessageKind, UserId};

// ----------------------------------------------------------------------------
// Client → Relay
// ----------------------------------------------------------------------------

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First frame on every socket: the authenticated identity, trusted
    /// opaquely (authentication itself lives outside the relay).
    Hello { user: UserId },
    /// Send a message to another user.
    SendMessage {
        to: UserId,
        kind: MessageKind,
        payload: String,
    },
    /// Ephemeral typing indicator; never persisted.
    Typing { to: UserId, is_typing: bool },
    /// Acknowledge having read a message in the conversation with `with`.
    MarkRead { with: UserId, message_id: MessageId },
    /// Re-fetch the full history of the conversation with `with`.
    FetchHistory { with: UserId },
}

// ----------------------------------------------------------------------------
// Relay → Client
// ----------------------------------------------------------------------------

/// Frames the relay pushes to a client session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A message forwarded live to its recipient.
    ReceiveMessage { message: Message },
    /// Send-confirmation echo to the sender; carries the stored message,
    /// delivered or not.
    MessageSent { message: Message },
    /// The recipient acknowledged reading a message.
    MessageRead {
        conversation: ConversationKey,
        message_id: MessageId,
        by: UserId,
    },
    /// A user came online.
    PresenceOnline { user: UserId },
    /// A user went offline; `last_seen` is when the relay recorded it.
    PresenceOffline {
        user: UserId,
        last_seen: Option<Timestamp>,
    },
    /// Forwarded typing indicator.
    Typing { from: UserId, is_typing: bool },
    /// Full conversation history in insertion order.
    History {
        with: UserId,
        messages: Vec<Message>,
    },
    /// A frame was rejected; nothing mutated.
    Error { reason: String },
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_round_trip_through_json() {
        let frames = vec![
            ClientFrame::Hello {
                user: UserId::new("alice"),
            },
            ClientFrame::SendMessage {
                to: UserId::new("bob"),
                kind: MessageKind::Voice,
                payload: "blob-ref".to_string(),
            },
            ClientFrame::Typing {
                to: UserId::new("bob"),
                is_typing: true,
            },
            ClientFrame::MarkRead {
                with: UserId::new("bob"),
                message_id: MessageId::generate(),
            },
            ClientFrame::FetchHistory {
                with: UserId::new("bob"),
            },
        ];

        for frame in frames {
            let json = serde_json::to_string(&frame).unwrap();
            let back: ClientFrame = serde_json::from_str(&json).unwrap();
            assert_eq!(back, frame);
        }
    }

    #[test]
    fn frames_are_internally_tagged() {
        let json = serde_json::to_value(ClientFrame::Typing {
            to: UserId::new("bob"),
            is_typing: false,
        })
        .unwrap();
        assert_eq!(json["type"], "typing");
        assert_eq!(json["to"], "bob");

        let json = serde_json::to_value(ServerFrame::PresenceOffline {
            user: UserId::new("bob"),
            last_seen: Some(Timestamp::new(42)),
        })
        .unwrap();
        assert_eq!(json["type"], "presence_offline");
        assert_eq!(json["last_seen"], 42);
    }

    #[test]
    fn unknown_frame_type_fails_to_parse() {
        let result: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"type":"selfdestruct","to":"bob"}"#);
        assert!(result.is_err());
    }
}
