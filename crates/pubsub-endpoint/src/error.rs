use std::fmt;

use pubsub_channel::ChannelError;

use crate::device::Fd;
use crate::role::Role;

/// Data-plane operation named in permission errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => f.write_str("read"),
            Operation::Write => f.write_str("write"),
        }
    }
}

/// Errors returned by endpoint and device operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// The handle's role does not allow this operation.
    #[error("{op} not permitted on {role} handle")]
    PermissionDenied { op: Operation, role: Role },

    /// The handle already has a role; roles are assigned once.
    #[error("role already assigned ({0})")]
    RoleAlreadyAssigned(Role),

    /// The control argument is not a publisher or subscriber tag.
    #[error("invalid role tag {0}")]
    InvalidRole(u64),

    /// The control command number is not recognised.
    #[error("unknown control command {0:#x}")]
    UnknownCommand(u32),

    /// The descriptor is not open on this device.
    #[error("bad handle {0}")]
    BadHandle(Fd),

    /// The minor number is outside the device's range.
    #[error("no such minor {minor} (device has {count})")]
    NoDevice { minor: u32, count: u32 },

    /// Channel-level error (write too large, queue full, no data).
    #[error("{0}")]
    Channel(#[from] ChannelError),
}

/// Coarse classification of an [`EndpointError`], mirroring errno values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    InvalidArgument,
    WouldBlock,
    NotTty,
    BadHandle,
    NoDevice,
}

impl ErrorKind {
    /// The errno a character device would report.
    pub fn errno(self) -> i32 {
        match self {
            ErrorKind::PermissionDenied => libc::EPERM,
            ErrorKind::InvalidArgument => libc::EINVAL,
            ErrorKind::WouldBlock => libc::EAGAIN,
            ErrorKind::NotTty => libc::ENOTTY,
            ErrorKind::BadHandle => libc::EBADF,
            ErrorKind::NoDevice => libc::ENXIO,
        }
    }

    fn io_kind(self) -> std::io::ErrorKind {
        match self {
            ErrorKind::PermissionDenied => std::io::ErrorKind::PermissionDenied,
            ErrorKind::InvalidArgument => std::io::ErrorKind::InvalidInput,
            ErrorKind::WouldBlock => std::io::ErrorKind::WouldBlock,
            ErrorKind::NotTty => std::io::ErrorKind::Unsupported,
            ErrorKind::BadHandle | ErrorKind::NoDevice => std::io::ErrorKind::NotFound,
        }
    }
}

impl EndpointError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EndpointError::PermissionDenied { .. } | EndpointError::RoleAlreadyAssigned(_) => {
                ErrorKind::PermissionDenied
            }
            EndpointError::InvalidRole(_) => ErrorKind::InvalidArgument,
            EndpointError::UnknownCommand(_) => ErrorKind::NotTty,
            EndpointError::BadHandle(_) => ErrorKind::BadHandle,
            EndpointError::NoDevice { .. } => ErrorKind::NoDevice,
            EndpointError::Channel(ChannelError::PayloadTooLarge { .. }) => {
                ErrorKind::InvalidArgument
            }
            EndpointError::Channel(ChannelError::QueueFull { .. } | ChannelError::Empty) => {
                ErrorKind::WouldBlock
            }
        }
    }

    /// Shorthand for `self.kind().errno()`.
    pub fn errno(&self) -> i32 {
        self.kind().errno()
    }

    /// True when the caller may retry the same call later.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::WouldBlock
    }
}

impl From<EndpointError> for std::io::Error {
    fn from(err: EndpointError) -> Self {
        std::io::Error::new(err.kind().io_kind(), err)
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;
