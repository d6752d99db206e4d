//! Presence broadcasting
//!
//! Fans presence changes out to every other connected user and forwards
//! ephemeral typing signals. Everything here is best-effort: a failed send
//! to one peer is logged and the fan-out continues.

use courier_core::{ServerFrame, TimeSource, Timestamp, UserId};
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

// ----------------------------------------------------------------------------
// Presence Broadcaster
// ----------------------------------------------------------------------------

/// Broadcasts presence transitions and typing signals over the registry.
#[derive(Debug, Default)]
pub struct PresenceBroadcaster {
    stats: PresenceStats,
}

/// Counters for presence traffic.
#[derive(Debug, Clone, Default)]
pub struct PresenceStats {
    pub online_broadcasts: u64,
    pub offline_broadcasts: u64,
    pub typing_forwarded: u64,
    pub typing_dropped: u64,
    pub failed_sends: u64,
}

impl PresenceBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell every other connected user that `user` came online.
    pub fn broadcast_online<T: TimeSource>(
        &mut self,
        registry: &ConnectionRegistry<T>,
        user: &UserId,
    ) {
        self.stats.online_broadcasts += 1;
        self.fan_out(
            registry,
            user,
            ServerFrame::PresenceOnline { user: user.clone() },
        );
    }

    /// Tell every other connected user that `user` went offline.
    pub fn broadcast_offline<T: TimeSource>(
        &mut self,
        registry: &ConnectionRegistry<T>,
        user: &UserId,
        last_seen: Option<Timestamp>,
    ) {
        self.stats.offline_broadcasts += 1;
        self.fan_out(
            registry,
            user,
            ServerFrame::PresenceOffline {
                user: user.clone(),
                last_seen,
            },
        );
    }

    /// Forward a typing signal to `to` if they are connected.
    ///
    /// Typing is ephemeral: never persisted, silently dropped when the
    /// recipient is offline.
    pub fn typing<T: TimeSource>(
        &mut self,
        registry: &ConnectionRegistry<T>,
        from: &UserId,
        to: &UserId,
        is_typing: bool,
    ) {
        match registry.lookup(to) {
            Some(handle) => {
                let frame = ServerFrame::Typing {
                    from: from.clone(),
                    is_typing,
                };
                if let Err(err) = handle.send(to, frame) {
                    self.stats.failed_sends += 1;
                    debug!("Typing signal to {to} failed: {err}");
                } else {
                    self.stats.typing_forwarded += 1;
                }
            }
            None => {
                self.stats.typing_dropped += 1;
            }
        }
    }

    /// Presence counters.
    pub fn stats(&self) -> &PresenceStats {
        &self.stats
    }

    fn fan_out<T: TimeSource>(
        &mut self,
        registry: &ConnectionRegistry<T>,
        about: &UserId,
        frame: ServerFrame,
    ) {
        for (user, handle) in registry.connected() {
            if user == about {
                continue;
            }
            if let Err(err) = handle.send(user, frame.clone()) {
                // Best-effort: one slow or gone peer must not block the rest.
                self.stats.failed_sends += 1;
                warn!("Presence frame to {user} failed: {err}");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
