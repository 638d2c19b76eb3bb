use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::queue::{QueueId, SubscriberQueue};

/// Fans published chunks out to every registered subscriber queue.
///
/// Membership changes and publishes are serialized by one lock, so a queue
/// either receives a whole chunk or none of it, and every queue observes
/// publishes in the same order. Draining only touches the queue's own lock.
#[derive(Debug)]
pub struct BroadcastChannel {
    config: ChannelConfig,
    queues: Mutex<Vec<Arc<SubscriberQueue>>>,
    next_queue_id: AtomicU64,
    publishes: AtomicU64,
    bytes_published: AtomicU64,
}

/// Point-in-time counters for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Number of registered subscriber queues.
    pub subscribers: usize,
    /// Accepted non-empty publishes since creation.
    pub publishes: u64,
    /// Bytes accepted by those publishes (counted once, not per subscriber).
    pub bytes_published: u64,
    /// Bytes currently waiting across all queues.
    pub buffered_bytes: usize,
}

impl BroadcastChannel {
    /// Create a channel with default limits.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Create a channel with explicit limits.
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            config,
            queues: Mutex::new(Vec::new()),
            next_queue_id: AtomicU64::new(1),
            publishes: AtomicU64::new(0),
            bytes_published: AtomicU64::new(0),
        }
    }

    /// Channel limits.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Create an empty queue and register it in one step.
    pub fn new_subscriber(&self) -> Arc<SubscriberQueue> {
        let id = self.next_queue_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(SubscriberQueue::new(id));
        self.register(Arc::clone(&queue));
        queue
    }

    /// Add a queue to the fan-out set.
    ///
    /// The queue only sees chunks published after this call returns.
    pub fn register(&self, queue: Arc<SubscriberQueue>) {
        let mut queues = self.lock_queues();
        let id = queue.id();
        if queues.iter().any(|q| q.id() == id) {
            tracing::warn!(queue = id, "subscriber queue already registered");
            return;
        }
        queues.push(queue);
        tracing::debug!(queue = id, subscribers = queues.len(), "subscriber registered");
    }

    /// Remove a queue from the fan-out set and hand it back.
    ///
    /// Returns `None` if the queue was not registered.
    pub fn unregister(&self, id: QueueId) -> Option<Arc<SubscriberQueue>> {
        let mut queues = self.lock_queues();
        let pos = queues.iter().position(|q| q.id() == id)?;
        let queue = queues.swap_remove(pos);
        tracing::debug!(
            queue = id,
            discarded = queue.len(),
            subscribers = queues.len(),
            "subscriber unregistered"
        );
        Some(queue)
    }

    /// Append `chunk` to the tail of every registered queue.
    ///
    /// Returns the number of bytes accepted, which is always `chunk.len()`.
    /// Oversized chunks, and chunks that would overflow a bounded queue, are
    /// rejected in full before anything is delivered.
    pub fn publish(&self, chunk: &[u8]) -> Result<usize> {
        let size = chunk.len();
        if size > self.config.max_write_size {
            tracing::warn!(
                size,
                max = self.config.max_write_size,
                "publish rejected: write too large"
            );
            return Err(ChannelError::PayloadTooLarge {
                size,
                max: self.config.max_write_size,
            });
        }
        if size == 0 {
            return Ok(0);
        }

        let queues = self.lock_queues();

        if let Some(limit) = self.config.max_queue_bytes {
            for queue in queues.iter() {
                let available = queue.room(Some(limit));
                if available < size {
                    tracing::warn!(
                        queue = queue.id(),
                        size,
                        available,
                        "publish rejected: queue full"
                    );
                    return Err(ChannelError::QueueFull {
                        queue: queue.id(),
                        needed: size,
                        available,
                    });
                }
            }
        }

        for queue in queues.iter() {
            queue.enqueue(chunk);
        }

        self.publishes.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(size as u64, Ordering::Relaxed);
        tracing::trace!(size, subscribers = queues.len(), "published chunk");

        Ok(size)
    }

    /// Number of registered subscriber queues.
    pub fn subscriber_count(&self) -> usize {
        self.lock_queues().len()
    }

    /// Snapshot of channel counters.
    pub fn stats(&self) -> ChannelStats {
        let queues = self.lock_queues();
        ChannelStats {
            subscribers: queues.len(),
            publishes: self.publishes.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            buffered_bytes: queues.iter().map(|q| q.len()).sum(),
        }
    }

    fn lock_queues(&self) -> MutexGuard<'_, Vec<Arc<SubscriberQueue>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}
