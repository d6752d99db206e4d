//! Message routing
//!
//! The router drives the per-message state machine: a send produces exactly
//! one append, at most one live forward, and exactly one echo back to the
//! sender. The later `delivered → read` transition is triggered only by an
//! explicit read receipt from the recipient, never by the router itself.

use courier_core::{
    validate_send, ConversationKey, ConversationStore, Message, MessageId, MessageKind,
    RelayConfig, ServerFrame, TimeSource, UserId, ValidationError,
};
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

// ----------------------------------------------------------------------------
// Message Router
// ----------------------------------------------------------------------------

/// Routes sends and read receipts between the store and the registry.
#[derive(Debug)]
pub struct MessageRouter {
    config: RelayConfig,
    stats: RouterStats,
}

/// Counters for routed traffic.
#[derive(Debug, Clone, Default)]
pub struct RouterStats {
    pub messages_sent: u64,
    pub live_deliveries: u64,
    pub pending_deliveries: u64,
    pub echo_failures: u64,
    pub read_receipts: u64,
    pub read_receipts_ignored: u64,
    pub read_notifications: u64,
}

impl MessageRouter {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            stats: RouterStats::default(),
        }
    }

    /// Handle a send request from `from`.
    ///
    /// Validation happens before anything mutates; a rejected request
    /// returns the error and leaves the store untouched. Otherwise the
    /// message is appended, forwarded to the recipient if they are online,
    /// and echoed back to the sender in its final delivered-or-pending
    /// state.
    pub fn send<T: TimeSource>(
        &mut self,
        store: &mut ConversationStore,
        registry: &ConnectionRegistry<T>,
        from: UserId,
        to: UserId,
        kind: MessageKind,
        payload: String,
        time_source: &T,
    ) -> Result<Message, ValidationError> {
        validate_send(&from, &to, kind, &payload, &self.config)?;

        let message = Message::new(from.clone(), to.clone(), kind, payload, time_source.now());
        let key = message.conversation_key();
        let id = store.append(message);

        // Delivery is decided by the recipient's registration at this
        // instant; a transport failure during the forward is treated the
        // same as the recipient being offline.
        if let Some(handle) = registry.lookup(&to) {
            let stored = store
                .get_mut(&key, id)
                .expect("message was just appended");
            stored.mark_delivered();
            let frame = ServerFrame::ReceiveMessage {
                message: stored.clone(),
            };
            if let Err(err) = handle.send(&to, frame) {
                warn!("Live forward to {to} failed, leaving message pending: {err}");
                stored.delivered = false;
            }
        }

        let stored = store
            .get(&key, id)
            .cloned()
            .expect("message was just appended");

        if stored.delivered {
            self.stats.live_deliveries += 1;
        } else {
            self.stats.pending_deliveries += 1;
        }
        self.stats.messages_sent += 1;

        // The echo always happens, delivered or not.
        if let Some(handle) = registry.lookup(&from) {
            let echo = ServerFrame::MessageSent {
                message: stored.clone(),
            };
            if let Err(err) = handle.send(&from, echo) {
                self.stats.echo_failures += 1;
                warn!("Send echo to {from} failed: {err}");
            }
        } else {
            // Sender raced their own disconnect; the message is stored
            // either way.
            self.stats.echo_failures += 1;
            debug!("Sender {from} went offline before the echo");
        }

        Ok(stored)
    }

    /// Handle a read receipt from `by` for a message in their conversation
    /// with `with`.
    ///
    /// Flips `read` (and `delivered`, preserving the invariant) and notifies
    /// the original sender if they are connected. A missing message, a
    /// receipt from anyone but the recipient, or an offline sender all make
    /// this a no-op rather than an error.
    pub fn mark_read<T: TimeSource>(
        &mut self,
        store: &mut ConversationStore,
        registry: &ConnectionRegistry<T>,
        by: UserId,
        with: UserId,
        message_id: MessageId,
    ) {
        let key = ConversationKey::new(by.clone(), with.clone());

        let Some(message) = store.get_mut(&key, message_id) else {
            self.stats.read_receipts_ignored += 1;
            debug!("Read receipt for unknown message {message_id} in {key}");
            return;
        };

        // Only the recipient can acknowledge.
        if message.to != by {
            self.stats.read_receipts_ignored += 1;
            debug!("Ignoring read receipt from {by} for a message addressed to {}", message.to);
            return;
        }

        message.mark_read();
        let sender = message.from.clone();
        self.stats.read_receipts += 1;

        if let Some(handle) = registry.lookup(&sender) {
            let frame = ServerFrame::MessageRead {
                conversation: key,
                message_id,
                by,
            };
            match handle.send(&sender, frame) {
                Ok(()) => self.stats.read_notifications += 1,
                Err(err) => debug!("Read notification to {sender} failed: {err}"),
            }
        }
    }

    /// Router counters.
    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
