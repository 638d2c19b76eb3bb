//! ioctl-style control codes.
//!
//! Command numbers follow the Linux `_IOC` layout so that a C harness can
//! pass the same values it would pass to `ioctl(2)` on `/dev/pubsub`.

use crate::error::{EndpointError, Result};
use crate::role::Role;

/// ioctl "type" byte for this device.
pub const PUBSUB_IOC_MAGIC: u8 = b'r';

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_NONE: u32 = 0;

/// Encode a command number like the kernel's `_IOC(dir, type, nr, size)`.
pub const fn ioc(dir: u32, ty: u8, nr: u8, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | (size << IOC_SIZESHIFT)
}

/// Encode a command number that carries no payload, like `_IO(type, nr)`.
pub const fn io(ty: u8, nr: u8) -> u32 {
    ioc(IOC_NONE, ty, nr, 0)
}

/// Assign a role; the argument is a raw role tag.
pub const SET_TYPE: u32 = io(PUBSUB_IOC_MAGIC, 0);
/// Query the role; the return value is a raw role tag.
pub const GET_TYPE: u32 = io(PUBSUB_IOC_MAGIC, 1);

/// A decoded control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetRole(Role),
    GetRole,
}

impl ControlCommand {
    /// Decode a raw `(cmd, arg)` pair.
    ///
    /// `SET_TYPE` only accepts the publisher and subscriber tags.
    pub fn decode(cmd: u32, arg: u64) -> Result<Self> {
        match cmd {
            SET_TYPE => match Role::from_raw(arg) {
                Some(role @ (Role::Publisher | Role::Subscriber)) => {
                    Ok(ControlCommand::SetRole(role))
                }
                _ => Err(EndpointError::InvalidRole(arg)),
            },
            GET_TYPE => Ok(ControlCommand::GetRole),
            other => Err(EndpointError::UnknownCommand(other)),
        }
    }

    /// Raw `(cmd, arg)` pair for this request.
    pub fn encode(self) -> (u32, u64) {
        match self {
            ControlCommand::SetRole(role) => (SET_TYPE, role.as_raw()),
            ControlCommand::GetRole => (GET_TYPE, 0),
        }
    }
}
