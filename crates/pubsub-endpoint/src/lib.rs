//! Per-handle publish/subscribe endpoint over a broadcast channel.
//!
//! A handle starts out unassigned, becomes a publisher or a subscriber
//! through one control call, and from then on may only write (publisher)
//! or only read (subscriber). [`Device`] layers a descriptor table with
//! minor numbers on top, so callers can drive the endpoint the way they
//! would drive a character device: open, ioctl, read, write, close.

pub mod config;
pub mod control;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod role;

pub use config::{DeviceConfig, DEFAULT_MINOR_COUNT, MAX_MINOR_COUNT};
pub use control::{ControlCommand, GET_TYPE, PUBSUB_IOC_MAGIC, SET_TYPE};
pub use device::{Device, Fd};
pub use endpoint::Endpoint;
pub use error::{EndpointError, ErrorKind, Operation, Result};
pub use role::{Role, TYPE_NONE, TYPE_PUB, TYPE_SUB};

pub use pubsub_channel::{ChannelConfig, ChannelStats, DEFAULT_MAX_WRITE_SIZE};
