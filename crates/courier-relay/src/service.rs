//! Relay service task
//!
//! One task owns the registry and the conversation store and processes
//! every session event in arrival order. All mutation happens inside this
//! loop, which is what makes the lock-free single-map design safe and gives
//! FIFO ordering per conversation. Transports talk to the loop through a
//! [`RelayHandle`].

use courier_core::{
    ClientFrame, ConversationKey, ConversationStore, RelayConfig, RelayError, ServerFrame,
    SessionId, TimeSource, UserId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::presence::PresenceBroadcaster;
use crate::registry::{ClientHandle, ConnectionRegistry};
use crate::router::MessageRouter;

// ----------------------------------------------------------------------------
// Session Events
// ----------------------------------------------------------------------------

/// Everything a transport can tell the relay, as one tagged stream.
#[derive(Debug)]
pub enum SessionEvent {
    /// A session finished its hello and is ready to receive frames.
    Connected { user: UserId, handle: ClientHandle },
    /// A frame arrived on an established session.
    Frame {
        user: UserId,
        session: SessionId,
        frame: ClientFrame,
    },
    /// The session's socket closed or failed.
    Disconnected { user: UserId, session: SessionId },
}

// ----------------------------------------------------------------------------
// Relay Handle
// ----------------------------------------------------------------------------

/// Cloneable handle transports use to feed events into the relay task.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    event_sender: mpsc::Sender<SessionEvent>,
    session_buffer: usize,
}

impl RelayHandle {
    /// Register a session for `user` and hand back its frame receiver.
    ///
    /// The returned [`SessionId`] must accompany every later event from this
    /// session so a superseded socket cannot act for its replacement.
    pub async fn connect(
        &self,
        user: UserId,
    ) -> Result<(SessionId, mpsc::Receiver<ServerFrame>), RelayError> {
        let (handle, receiver) = ClientHandle::channel(self.session_buffer);
        let session = handle.session();
        self.send(SessionEvent::Connected { user, handle }).await?;
        Ok((session, receiver))
    }

    /// Forward a client frame to the relay.
    pub async fn frame(
        &self,
        user: UserId,
        session: SessionId,
        frame: ClientFrame,
    ) -> Result<(), RelayError> {
        self.send(SessionEvent::Frame {
            user,
            session,
            frame,
        })
        .await
    }

    /// Report a closed session.
    pub async fn disconnect(&self, user: UserId, session: SessionId) -> Result<(), RelayError> {
        self.send(SessionEvent::Disconnected { user, session }).await
    }

    async fn send(&self, event: SessionEvent) -> Result<(), RelayError> {
        self.event_sender
            .send(event)
            .await
            .map_err(|_| RelayError::ChannelClosed {
                reason: "relay task stopped".to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Relay Service
// ----------------------------------------------------------------------------

/// The relay task state: registry, store, router, presence, all owned here.
pub struct RelayService<T: TimeSource + Clone> {
    registry: ConnectionRegistry<T>,
    store: ConversationStore,
    router: MessageRouter,
    presence: PresenceBroadcaster,
    time_source: T,
    event_receiver: mpsc::Receiver<SessionEvent>,
    stats: ServiceStats,
}

/// Counters for the service loop.
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    pub events_processed: u64,
    pub frames_processed: u64,
    pub frames_rejected: u64,
}

impl<T: TimeSource + Clone> RelayService<T> {
    /// Build the service and the handle transports will use to reach it.
    pub fn new(config: RelayConfig, time_source: T) -> (Self, RelayHandle) {
        let (event_sender, event_receiver) = mpsc::channel(config.event_buffer_size);
        let handle = RelayHandle {
            event_sender,
            session_buffer: config.session_buffer_size,
        };
        let service = Self {
            registry: ConnectionRegistry::new(time_source.clone()),
            store: ConversationStore::new(),
            router: MessageRouter::new(config),
            presence: PresenceBroadcaster::new(),
            time_source,
            event_receiver,
            stats: ServiceStats::default(),
        };
        (service, handle)
    }

    /// Run the relay loop until every handle is dropped.
    pub async fn run(mut self) {
        info!("Relay service starting");

        while let Some(event) = self.event_receiver.recv().await {
            self.stats.events_processed += 1;
            self.process_event(event);
        }

        info!(
            events = self.stats.events_processed,
            connections = self.registry.connection_count(),
            "Relay service stopped"
        );
    }

    fn process_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { user, handle } => self.handle_connected(user, handle),
            SessionEvent::Frame {
                user,
                session,
                frame,
            } => self.handle_frame(user, session, frame),
            SessionEvent::Disconnected { user, session } => {
                self.handle_disconnected(user, session)
            }
        }
    }

    fn handle_connected(&mut self, user: UserId, handle: ClientHandle) {
        let replaced = self.registry.register(user.clone(), handle);
        match replaced {
            Some(old) => {
                // Last connect wins; the old session's channel closes when
                // `old` drops here.
                info!("User {user} reconnected, superseding session {}", old.session());
            }
            None => {
                info!("User {user} connected");
            }
        }
        self.presence.broadcast_online(&self.registry, &user);
    }

    fn handle_disconnected(&mut self, user: UserId, session: SessionId) {
        match self.registry.unregister(&user, session) {
            Some(last_seen) => {
                info!("User {user} disconnected");
                self.presence
                    .broadcast_offline(&self.registry, &user, Some(last_seen));
            }
            None => {
                debug!("Stale disconnect for {user}, session {session}");
            }
        }
    }

    fn handle_frame(&mut self, user: UserId, session: SessionId, frame: ClientFrame) {
        // Frames from a superseded session are dropped; its user already
        // speaks through a newer socket.
        let current = self
            .registry
            .lookup(&user)
            .map(|handle| handle.session() == session)
            .unwrap_or(false);
        if !current {
            debug!("Dropping frame from stale session {session} of {user}");
            return;
        }

        self.stats.frames_processed += 1;

        match frame {
            ClientFrame::Hello { .. } => {
                // The transport consumes the hello; a second one is a
                // client bug.
                self.reject(&user, "unexpected hello on established session");
            }
            ClientFrame::SendMessage { to, kind, payload } => {
                let result = self.router.send(
                    &mut self.store,
                    &self.registry,
                    user.clone(),
                    to,
                    kind,
                    payload,
                    &self.time_source,
                );
                if let Err(err) = result {
                    self.reject(&user, &err.to_string());
                }
            }
            ClientFrame::Typing { to, is_typing } => {
                self.presence.typing(&self.registry, &user, &to, is_typing);
            }
            ClientFrame::MarkRead { with, message_id } => {
                self.router
                    .mark_read(&mut self.store, &self.registry, user, with, message_id);
            }
            ClientFrame::FetchHistory { with } => {
                let key = ConversationKey::new(user.clone(), with.clone());
                let messages = self.store.list(&key).to_vec();
                self.push(&user, ServerFrame::History { with, messages });
            }
        }
    }

    /// Send an error frame to one session; nothing has mutated.
    fn reject(&mut self, user: &UserId, reason: &str) {
        self.stats.frames_rejected += 1;
        warn!("Rejected frame from {user}: {reason}");
        self.push(
            user,
            ServerFrame::Error {
                reason: reason.to_string(),
            },
        );
    }

    fn push(&self, user: &UserId, frame: ServerFrame) {
        if let Some(handle) = self.registry.lookup(user) {
            if let Err(err) = handle.send(user, frame) {
                debug!("Push to {user} failed: {err}");
            }
        }
    }

    /// Service counters.
    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }
}
