//! Relay configuration
//!
//! Validation limits and channel sizing, with defaults suitable for a
//! single-process deployment. Loaded and layered by the binary crate.

use serde::{Deserialize, Serialize};

/// Configuration for the relay core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Maximum message payload size in bytes (applies to every kind).
    pub max_payload_bytes: usize,
    /// Maximum text message length in characters.
    pub max_text_chars: usize,
    /// Buffer size of the session event channel feeding the relay task.
    pub event_buffer_size: usize,
    /// Buffer size of each per-session outbound frame channel.
    pub session_buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024,
            max_text_chars: 4096,
            event_buffer_size: 256,
            session_buffer_size: 64,
        }
    }
}
