use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use pubsub_channel::BroadcastChannel;

use crate::control::ControlCommand;
use crate::device::Fd;
use crate::error::{EndpointError, Operation, Result};
use crate::role::{Role, RoleBinding};

/// One open handle on a broadcast channel.
///
/// Every data-plane call checks the handle's role first: only publishers
/// write, only subscribers read. Dropping the endpoint closes it.
#[derive(Debug)]
pub struct Endpoint {
    id: Fd,
    minor: u32,
    channel: Arc<BroadcastChannel>,
    binding: RwLock<RoleBinding>,
}

impl Endpoint {
    pub(crate) fn new(id: Fd, minor: u32, channel: Arc<BroadcastChannel>) -> Self {
        tracing::debug!(handle = id, minor, "handle opened");
        Self {
            id,
            minor,
            channel,
            binding: RwLock::new(RoleBinding::default()),
        }
    }

    /// Handle identifier.
    pub fn id(&self) -> Fd {
        self.id
    }

    /// Minor number of the channel this handle is attached to.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Current role. Fresh handles are [`Role::Unassigned`].
    pub fn role(&self) -> Role {
        self.binding().role()
    }

    /// Assign the handle's role. Allowed once per handle.
    pub fn set_role(&self, role: Role) -> Result<()> {
        let mut binding = self.binding_mut();
        binding.assign(role, &self.channel)?;
        tracing::debug!(handle = self.id, minor = self.minor, %role, "role assigned");
        Ok(())
    }

    /// Execute a decoded control request and return its result value.
    pub fn control(&self, command: ControlCommand) -> Result<u64> {
        match command {
            ControlCommand::SetRole(role) => self.set_role(role).map(|()| 0),
            ControlCommand::GetRole => Ok(self.role().as_raw()),
        }
    }

    /// Broadcast `data` to every live subscriber on this handle's channel.
    ///
    /// The whole call fails, delivering nothing, if `data` exceeds the
    /// write-size limit.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let binding = self.binding();
        if !matches!(*binding, RoleBinding::Publisher) {
            return Err(EndpointError::PermissionDenied {
                op: Operation::Write,
                role: binding.role(),
            });
        }
        drop(binding);

        Ok(self.channel.publish(data)?)
    }

    /// Drain up to `max_len` bytes from this subscriber's queue.
    ///
    /// Returns a short chunk if fewer bytes are buffered, and fails with a
    /// retryable error if none are.
    pub fn read(&self, max_len: usize) -> Result<Bytes> {
        let queue = {
            let binding = self.binding();
            match binding.queue() {
                Some(queue) => Arc::clone(queue),
                None => {
                    return Err(EndpointError::PermissionDenied {
                        op: Operation::Read,
                        role: binding.role(),
                    })
                }
            }
        };

        Ok(queue.drain(max_len)?)
    }

    /// Read into `buf`, returning the number of bytes copied.
    pub fn read_into(&self, buf: &mut [u8]) -> Result<usize> {
        let chunk = self.read(buf.len())?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Bytes waiting to be read; always 0 for non-subscribers.
    pub fn pending(&self) -> usize {
        self.binding().queue().map_or(0, |queue| queue.len())
    }

    /// Close the handle, discarding any unread bytes.
    pub fn close(self) {
        drop(self);
    }

    /// Stop receiving broadcasts without giving up the handle value.
    pub(crate) fn release(&self) {
        self.binding().release(&self.channel);
    }

    fn binding(&self) -> RwLockReadGuard<'_, RoleBinding> {
        self.binding.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn binding_mut(&self) -> RwLockWriteGuard<'_, RoleBinding> {
        self.binding.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let binding = self.binding.get_mut().unwrap_or_else(PoisonError::into_inner);
        let discarded = binding.queue().map_or(0, |queue| queue.len());
        binding.release(&self.channel);
        tracing::debug!(
            handle = self.id,
            minor = self.minor,
            role = %binding.role(),
            discarded,
            "handle closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use pubsub_channel::{ChannelConfig, ChannelError};

    use super::*;
    use crate::control::{GET_TYPE, SET_TYPE};

    fn open(channel: &Arc<BroadcastChannel>, id: Fd) -> Endpoint {
        Endpoint::new(id, 0, Arc::clone(channel))
    }

    #[test]
    fn fresh_handle_is_unassigned() {
        let channel = Arc::new(BroadcastChannel::new());
        assert_eq!(open(&channel, 1).role(), Role::Unassigned);
    }

    #[test]
    fn publisher_cannot_read() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        publisher.set_role(Role::Publisher).unwrap();

        assert_eq!(publisher.role(), Role::Publisher);
        assert_eq!(
            publisher.read(100).unwrap_err(),
            EndpointError::PermissionDenied {
                op: Operation::Read,
                role: Role::Publisher
            }
        );
    }

    #[test]
    fn subscriber_cannot_write() {
        let channel = Arc::new(BroadcastChannel::new());
        let subscriber = open(&channel, 1);
        subscriber.set_role(Role::Subscriber).unwrap();

        let err = subscriber.write(b"Invalid write").unwrap_err();
        assert_eq!(err.errno(), libc::EPERM);
    }

    #[test]
    fn unassigned_handle_can_neither_read_nor_write() {
        let channel = Arc::new(BroadcastChannel::new());
        let handle = open(&channel, 1);

        assert!(matches!(
            handle.read(50),
            Err(EndpointError::PermissionDenied {
                role: Role::Unassigned,
                ..
            })
        ));
        assert!(matches!(
            handle.write(b"x"),
            Err(EndpointError::PermissionDenied {
                role: Role::Unassigned,
                ..
            })
        ));
    }

    #[test]
    fn write_returns_bytes_accepted() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        publisher.set_role(Role::Publisher).unwrap();

        assert_eq!(publisher.write(b"hello").unwrap(), 5);
    }

    #[test]
    fn oversized_write_is_invalid_and_undelivered() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        let subscriber = open(&channel, 2);
        publisher.set_role(Role::Publisher).unwrap();
        subscriber.set_role(Role::Subscriber).unwrap();

        let err = publisher.write(&[b'X'; 1050]).unwrap_err();

        assert_eq!(err.errno(), libc::EINVAL);
        assert_eq!(subscriber.pending(), 0);
        assert_eq!(
            subscriber.read(10).unwrap_err(),
            EndpointError::Channel(ChannelError::Empty)
        );
    }

    #[test]
    fn fan_out_then_short_read() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        let sub_a = open(&channel, 2);
        let sub_b = open(&channel, 3);
        publisher.set_role(Role::Publisher).unwrap();
        sub_a.set_role(Role::Subscriber).unwrap();
        sub_b.set_role(Role::Subscriber).unwrap();

        assert_eq!(publisher.write(&[b'A'; 700]).unwrap(), 700);
        assert_eq!(sub_a.read(700).unwrap().len(), 700);
        assert_eq!(sub_b.read(700).unwrap().len(), 700);

        assert_eq!(publisher.write(&[b'B'; 700]).unwrap(), 700);
        assert_eq!(sub_a.read(500).unwrap().len(), 500);
        assert_eq!(sub_a.read(300).unwrap().len(), 200);
        assert_eq!(sub_b.read(700).unwrap().len(), 700);
    }

    #[test]
    fn reads_preserve_publish_order() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        let subscriber = open(&channel, 2);
        publisher.set_role(Role::Publisher).unwrap();
        subscriber.set_role(Role::Subscriber).unwrap();

        publisher.write(b"first ").unwrap();
        publisher.write(b"second ").unwrap();
        publisher.write(b"third").unwrap();

        let mut out = Vec::new();
        while let Ok(chunk) = subscriber.read(4) {
            out.extend_from_slice(&chunk);
        }
        assert_eq!(out, b"first second third");
    }

    #[test]
    fn closing_one_subscriber_leaves_others_untouched() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        let keep = open(&channel, 2);
        let gone = open(&channel, 3);
        publisher.set_role(Role::Publisher).unwrap();
        keep.set_role(Role::Subscriber).unwrap();
        gone.set_role(Role::Subscriber).unwrap();

        publisher.write(b"abc").unwrap();
        gone.close();
        publisher.write(b"def").unwrap();

        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(keep.read(64).unwrap().as_ref(), b"abcdef");
    }

    #[test]
    fn control_dispatches_raw_commands() {
        let channel = Arc::new(BroadcastChannel::new());
        let handle = open(&channel, 1);

        let get = ControlCommand::decode(GET_TYPE, 0).unwrap();
        assert_eq!(handle.control(get).unwrap(), 0);

        let set = ControlCommand::decode(SET_TYPE, 2).unwrap();
        assert_eq!(handle.control(set).unwrap(), 0);
        assert_eq!(handle.control(get).unwrap(), 2);

        let again = ControlCommand::decode(SET_TYPE, 1).unwrap();
        assert_eq!(
            handle.control(again).unwrap_err(),
            EndpointError::RoleAlreadyAssigned(Role::Subscriber)
        );
    }

    #[test]
    fn read_into_copies_prefix() {
        let channel = Arc::new(BroadcastChannel::new());
        let publisher = open(&channel, 1);
        let subscriber = open(&channel, 2);
        publisher.set_role(Role::Publisher).unwrap();
        subscriber.set_role(Role::Subscriber).unwrap();
        publisher.write(b"hello").unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(subscriber.read_into(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn custom_write_limit_applies() {
        let channel = Arc::new(BroadcastChannel::with_config(
            ChannelConfig::default().with_max_write_size(1000),
        ));
        let publisher = open(&channel, 1);
        publisher.set_role(Role::Publisher).unwrap();

        assert_eq!(publisher.write(&[0u8; 1000]).unwrap(), 1000);
        assert_eq!(publisher.write(&[0u8; 1001]).unwrap_err().errno(), libc::EINVAL);
    }
}
