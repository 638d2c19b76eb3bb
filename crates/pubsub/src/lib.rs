//! Broadcast publish/subscribe endpoint.
//!
//! A single device fans every byte a publisher writes out to the private
//! queue of each subscriber that is open at the time of the write. Handles
//! pick their role once, through a control call, and are then limited to
//! writing (publishers) or reading (subscribers).
//!
//! # Crate Structure
//!
//! - [`channel`]: Subscriber queues and the broadcast channel that feeds them
//! - [`endpoint`]: Roles, per-handle endpoints, control codes and the device table

/// Re-export channel types.
pub mod channel {
    pub use pubsub_channel::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use pubsub_endpoint::*;
}
