use serde::{Deserialize, Serialize};

/// Canonical maximum number of bytes accepted by a single write.
pub const DEFAULT_MAX_WRITE_SIZE: usize = 1024;

/// Limits applied by a [`BroadcastChannel`](crate::BroadcastChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Maximum payload accepted per publish call. Default: 1024 bytes.
    pub max_write_size: usize,
    /// Per-queue buffered byte ceiling. `None` leaves queues unbounded.
    pub max_queue_bytes: Option<usize>,
}

impl ChannelConfig {
    /// Override the per-call write-size limit.
    pub fn with_max_write_size(mut self, max_write_size: usize) -> Self {
        self.max_write_size = max_write_size;
        self
    }

    /// Bound every subscriber queue to `max_queue_bytes` buffered bytes.
    pub fn with_max_queue_bytes(mut self, max_queue_bytes: usize) -> Self {
        self.max_queue_bytes = Some(max_queue_bytes);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_write_size: DEFAULT_MAX_WRITE_SIZE,
            max_queue_bytes: None,
        }
    }
}
