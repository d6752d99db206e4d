//! Courier relay runtime
//!
//! Single-task message relay: a connection registry mapping users to live
//! session handles, a router driving the send/deliver/read state machine
//! over the conversation store, and a best-effort presence broadcaster.
//! Transports feed the task through a [`RelayHandle`]; everything stateful
//! is owned by [`RelayService`] and mutated only inside its loop.

pub mod presence;
pub mod registry;
pub mod router;
pub mod service;

pub use presence::{PresenceBroadcaster, PresenceStats};
pub use registry::{ClientHandle, ConnectionRegistry, RegistryStats};
pub use router::{MessageRouter, RouterStats};
pub use service::{RelayHandle, RelayService, ServiceStats, SessionEvent};
