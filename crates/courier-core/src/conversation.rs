//! In-memory conversation storage
//!
//! Maps each conversation key to the append-only, insertion-ordered list of
//! its messages. The store is owned by the relay task and mutated only from
//! there; there is no eviction or persistence — history lives for the
//! lifetime of the process.

use std::collections::HashMap;

use crate::message::Message;
use crate::types::{ConversationKey, MessageId, UserId};

// ----------------------------------------------------------------------------
// Conversation Store
// ----------------------------------------------------------------------------

/// Append-only message storage keyed by conversation.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationKey, Vec<Message>>,
    stats: ConversationStoreStats,
}

/// Store-wide counters.
#[derive(Debug, Clone, Default)]
pub struct ConversationStoreStats {
    pub total_messages: usize,
    pub unique_conversations: usize,
}

impl ConversationStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to its conversation.
    ///
    /// The key is derived from the message's own endpoints, so a message can
    /// never be filed under a conversation it does not belong to.
    pub fn append(&mut self, message: Message) -> MessageId {
        let key = message.conversation_key();
        let id = message.id;

        let list = self.conversations.entry(key).or_insert_with(|| {
            self.stats.unique_conversations += 1;
            Vec::new()
        });
        list.push(message);
        self.stats.total_messages += 1;

        id
    }

    /// Full history of a conversation in insertion order.
    ///
    /// An unknown key is an empty conversation, not an error; callers may
    /// re-fetch at any time.
    pub fn list(&self, key: &ConversationKey) -> &[Message] {
        self.conversations
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up one message within a conversation.
    pub fn get(&self, key: &ConversationKey, id: MessageId) -> Option<&Message> {
        self.conversations
            .get(key)?
            .iter()
            .find(|message| message.id == id)
    }

    /// Mutable lookup, used for the delivered/read transitions.
    pub fn get_mut(&mut self, key: &ConversationKey, id: MessageId) -> Option<&mut Message> {
        self.conversations
            .get_mut(key)?
            .iter_mut()
            .find(|message| message.id == id)
    }

    /// All conversations a user participates in.
    pub fn conversations_of(&self, user: &UserId) -> Vec<&ConversationKey> {
        self.conversations
            .keys()
            .filter(|key| key.involves(user))
            .collect()
    }

    /// Store counters.
    pub fn stats(&self) -> &ConversationStoreStats {
        &self.stats
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
