use crate::queue::QueueId;

/// Errors that can occur while publishing to or draining from a channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// A single publish exceeded the per-call write-size limit.
    #[error("write too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A bounded queue has no room for the whole chunk.
    #[error("subscriber queue {queue} full ({needed} bytes needed, {available} available)")]
    QueueFull {
        queue: QueueId,
        needed: usize,
        available: usize,
    },

    /// The queue holds no bytes yet; retry after more data is published.
    #[error("no data available")]
    Empty,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
