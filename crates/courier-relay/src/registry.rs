//! Connection registry
//!
//! Maps each authenticated user to their one live client handle. Last
//! connect wins: registering over an existing handle replaces it, and the
//! replaced handle is no longer addressable. Unregistering records a
//! last-seen timestamp and is guarded by the session id, so a disconnect
//! arriving late from a superseded socket cannot evict its replacement.

use std::collections::HashMap;

use courier_core::{
    RelayError, ServerFrame, SessionId, TimeSource, Timestamp, UserId,
};
use tokio::sync::mpsc;

// ----------------------------------------------------------------------------
// Client Handle
// ----------------------------------------------------------------------------

/// Live transport session bound to a user: a bounded sender of server frames
/// plus the session id distinguishing it from any replacement.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    session: SessionId,
    sender: mpsc::Sender<ServerFrame>,
}

impl ClientHandle {
    /// Create a handle and the receiving end its transport will pump.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (
            Self {
                session: SessionId::generate(),
                sender,
            },
            receiver,
        )
    }

    /// The session id this handle was created with.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Push a frame to the session without blocking the relay task.
    ///
    /// A full buffer or a gone session surfaces as a [`RelayError`]; callers
    /// treat both like the recipient being offline.
    pub fn send(&self, user: &UserId, frame: ServerFrame) -> Result<(), RelayError> {
        self.sender.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => RelayError::SessionBufferFull {
                user: user.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => RelayError::ChannelClosed {
                reason: format!("session for {user} is gone"),
            },
        })
    }
}

// ----------------------------------------------------------------------------
// Connection Registry
// ----------------------------------------------------------------------------

/// Registry of live connections, owned and mutated only by the relay task.
#[derive(Debug)]
pub struct ConnectionRegistry<T: TimeSource> {
    connections: HashMap<UserId, ClientHandle>,
    last_seen: HashMap<UserId, Timestamp>,
    time_source: T,
    stats: RegistryStats,
}

/// Counters for registry lifecycle operations.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub registered: u64,
    pub replaced: u64,
    pub unregistered: u64,
    pub stale_disconnects: u64,
}

impl<T: TimeSource> ConnectionRegistry<T> {
    /// Create an empty registry.
    pub fn new(time_source: T) -> Self {
        Self {
            connections: HashMap::new(),
            last_seen: HashMap::new(),
            time_source,
            stats: RegistryStats::default(),
        }
    }

    /// Bind a handle to a user, replacing any prior one.
    ///
    /// Returns the replaced handle so the caller can observe the takeover;
    /// dropping it closes the superseded session's frame channel.
    pub fn register(&mut self, user: UserId, handle: ClientHandle) -> Option<ClientHandle> {
        self.stats.registered += 1;
        let replaced = self.connections.insert(user, handle);
        if replaced.is_some() {
            self.stats.replaced += 1;
        }
        replaced
    }

    /// Remove a user's handle if `session` still identifies it.
    ///
    /// Records the last-seen timestamp and returns it on success. A stale
    /// session id (the user already reconnected) removes nothing.
    pub fn unregister(&mut self, user: &UserId, session: SessionId) -> Option<Timestamp> {
        match self.connections.get(user) {
            Some(current) if current.session() == session => {
                self.connections.remove(user);
                let now = self.time_source.now();
                self.last_seen.insert(user.clone(), now);
                self.stats.unregistered += 1;
                Some(now)
            }
            _ => {
                self.stats.stale_disconnects += 1;
                None
            }
        }
    }

    /// Current handle for a user. Absence is the normal offline case.
    pub fn lookup(&self, user: &UserId) -> Option<&ClientHandle> {
        self.connections.get(user)
    }

    /// When the user last disconnected, if they ever did.
    pub fn last_seen(&self, user: &UserId) -> Option<Timestamp> {
        self.last_seen.get(user).copied()
    }

    /// All currently connected users with their handles.
    pub fn connected(&self) -> impl Iterator<Item = (&UserId, &ClientHandle)> {
        self.connections.iter()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Registry counters.
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ManualTimeSource;

    fn user(name: &str) -> UserId {
        UserId::new(name)
    }

    #[test]
    fn register_then_lookup() {
        let mut registry = ConnectionRegistry::new(ManualTimeSource::new(0));
        let (handle, _rx) = ClientHandle::channel(4);
        let session = handle.session();

        assert!(registry.register(user("alice"), handle).is_none());
        assert_eq!(registry.lookup(&user("alice")).unwrap().session(), session);
        assert!(registry.lookup(&user("bob")).is_none());
    }

    #[test]
    fn last_connect_wins() {
        let mut registry = ConnectionRegistry::new(ManualTimeSource::new(0));
        let (old, _old_rx) = ClientHandle::channel(4);
        let (new, _new_rx) = ClientHandle::channel(4);
        let old_session = old.session();
        let new_session = new.session();

        registry.register(user("alice"), old);
        let replaced = registry.register(user("alice"), new);

        assert_eq!(replaced.unwrap().session(), old_session);
        assert_eq!(
            registry.lookup(&user("alice")).unwrap().session(),
            new_session
        );
        assert_eq!(registry.stats().replaced, 1);
    }

    #[test]
    fn stale_disconnect_does_not_evict_replacement() {
        let mut registry = ConnectionRegistry::new(ManualTimeSource::new(0));
        let (old, _old_rx) = ClientHandle::channel(4);
        let (new, _new_rx) = ClientHandle::channel(4);
        let old_session = old.session();

        registry.register(user("alice"), old);
        registry.register(user("alice"), new);

        assert!(registry.unregister(&user("alice"), old_session).is_none());
        assert!(registry.lookup(&user("alice")).is_some());
        assert_eq!(registry.stats().stale_disconnects, 1);
    }

    #[test]
    fn unregister_records_last_seen() {
        let clock = ManualTimeSource::new(10_000);
        let mut registry = ConnectionRegistry::new(clock.clone());
        let (handle, _rx) = ClientHandle::channel(4);
        let session = handle.session();

        registry.register(user("alice"), handle);
        clock.advance(5_000);
        let last_seen = registry.unregister(&user("alice"), session).unwrap();

        assert_eq!(last_seen, Timestamp::new(15_000));
        assert_eq!(registry.last_seen(&user("alice")), Some(last_seen));
        assert!(registry.lookup(&user("alice")).is_none());
    }

    #[test]
    fn unregister_unknown_user_is_idempotent() {
        let mut registry: ConnectionRegistry<ManualTimeSource> =
            ConnectionRegistry::new(ManualTimeSource::new(0));
        assert!(registry
            .unregister(&user("ghost"), SessionId::generate())
            .is_none());
        assert_eq!(registry.connection_count(), 0);
    }
}
