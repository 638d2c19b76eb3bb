use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};

use crate::error::{ChannelError, Result};

const INITIAL_QUEUE_CAPACITY: usize = 1024;

/// Identifier assigned to a queue by the channel that created it.
pub type QueueId = u64;

/// A FIFO byte buffer owned by exactly one subscriber.
///
/// The channel appends to it on every publish; the owning subscriber
/// drains it from the head. Each queue carries its own lock, so draining
/// one queue never contends with another.
#[derive(Debug)]
pub struct SubscriberQueue {
    id: QueueId,
    buf: Mutex<BytesMut>,
}

impl SubscriberQueue {
    /// Create an empty queue.
    pub fn new(id: QueueId) -> Self {
        Self {
            id,
            buf: Mutex::new(BytesMut::with_capacity(INITIAL_QUEUE_CAPACITY)),
        }
    }

    /// Queue identifier.
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Append `chunk` to the tail.
    pub fn enqueue(&self, chunk: &[u8]) {
        self.lock().extend_from_slice(chunk);
    }

    /// Remove and return up to `max_len` bytes from the head.
    ///
    /// Returns fewer bytes than requested when fewer are buffered.
    /// Fails with [`ChannelError::Empty`] when nothing is buffered.
    pub fn drain(&self, max_len: usize) -> Result<Bytes> {
        let mut buf = self.lock();
        if buf.is_empty() {
            return Err(ChannelError::Empty);
        }

        let take = max_len.min(buf.len());
        let chunk = buf.split_to(take).freeze();
        tracing::trace!(
            queue = self.id,
            requested = max_len,
            returned = take,
            remaining = buf.len(),
            "drained subscriber queue"
        );
        Ok(chunk)
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Bytes that still fit under `limit`; unbounded when `limit` is `None`.
    pub fn room(&self, limit: Option<usize>) -> usize {
        match limit {
            Some(limit) => limit.saturating_sub(self.len()),
            None => usize::MAX,
        }
    }

    // A panic while holding the lock cannot leave the buffer half-written:
    // every mutation is a single BytesMut call.
    fn lock(&self) -> MutexGuard<'_, BytesMut> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
