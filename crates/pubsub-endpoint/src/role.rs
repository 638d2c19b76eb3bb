use std::fmt;
use std::sync::Arc;

use pubsub_channel::{BroadcastChannel, SubscriberQueue};
use serde::Serialize;

use crate::error::{EndpointError, Result};

/// Raw control tag: no role assigned yet.
pub const TYPE_NONE: u64 = 0;
/// Raw control tag: publisher.
pub const TYPE_PUB: u64 = 1;
/// Raw control tag: subscriber.
pub const TYPE_SUB: u64 = 2;

/// The role a handle plays on its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Unassigned,
    Publisher,
    Subscriber,
}

impl Role {
    /// Parse a raw control tag.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            TYPE_NONE => Some(Role::Unassigned),
            TYPE_PUB => Some(Role::Publisher),
            TYPE_SUB => Some(Role::Subscriber),
            _ => None,
        }
    }

    /// Raw control tag for this role.
    pub fn as_raw(self) -> u64 {
        match self {
            Role::Unassigned => TYPE_NONE,
            Role::Publisher => TYPE_PUB,
            Role::Subscriber => TYPE_SUB,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role state of a single handle.
///
/// `Unassigned` moves to `Publisher` or `Subscriber` exactly once. A
/// subscriber binding owns the queue the channel feeds for it.
#[derive(Debug, Default)]
pub(crate) enum RoleBinding {
    #[default]
    Unassigned,
    Publisher,
    Subscriber(Arc<SubscriberQueue>),
}

impl RoleBinding {
    pub(crate) fn role(&self) -> Role {
        match self {
            RoleBinding::Unassigned => Role::Unassigned,
            RoleBinding::Publisher => Role::Publisher,
            RoleBinding::Subscriber(_) => Role::Subscriber,
        }
    }

    /// Leave the unassigned state.
    ///
    /// Becoming a subscriber registers a fresh, empty queue with `channel`.
    pub(crate) fn assign(&mut self, role: Role, channel: &BroadcastChannel) -> Result<()> {
        if !matches!(self, RoleBinding::Unassigned) {
            return Err(EndpointError::RoleAlreadyAssigned(self.role()));
        }

        *self = match role {
            Role::Unassigned => return Err(EndpointError::InvalidRole(TYPE_NONE)),
            Role::Publisher => RoleBinding::Publisher,
            Role::Subscriber => RoleBinding::Subscriber(channel.new_subscriber()),
        };
        Ok(())
    }

    pub(crate) fn queue(&self) -> Option<&Arc<SubscriberQueue>> {
        match self {
            RoleBinding::Subscriber(queue) => Some(queue),
            _ => None,
        }
    }

    /// Stop the channel feeding this binding's queue. Safe to call repeatedly.
    pub(crate) fn release(&self, channel: &BroadcastChannel) {
        if let Some(queue) = self.queue() {
            channel.unregister(queue.id());
        }
    }
}
