//! Broadcast fan-out of raw byte chunks to independent subscriber queues.
//!
//! This is the lowest layer of the pubsub endpoint. A [`BroadcastChannel`]
//! owns the live set of [`SubscriberQueue`]s and appends every published
//! chunk to each of them:
//! - A chunk is delivered whole to every queue registered at publish time
//! - Queues drain independently, with short reads when less is buffered
//! - Writes above the configured limit are rejected before any delivery
//!
//! Roles and handles live one layer up, in `pubsub-endpoint`.

pub mod channel;
pub mod config;
pub mod error;
pub mod queue;

pub use channel::{BroadcastChannel, ChannelStats};
pub use config::{ChannelConfig, DEFAULT_MAX_WRITE_SIZE};
pub use error::{ChannelError, Result};
pub use queue::{QueueId, SubscriberQueue};
