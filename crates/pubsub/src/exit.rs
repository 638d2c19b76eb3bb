use std::fmt;
use std::io;

use pubsub_endpoint::{EndpointError, ErrorKind};

// Process exit codes shared by every command.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn endpoint_error(context: &str, err: EndpointError) -> CliError {
    let code = match err.kind() {
        ErrorKind::PermissionDenied => PERMISSION_DENIED,
        ErrorKind::InvalidArgument => DATA_INVALID,
        ErrorKind::WouldBlock => TIMEOUT,
        ErrorKind::NotTty | ErrorKind::NoDevice => USAGE,
        ErrorKind::BadHandle => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use pubsub_endpoint::{Operation, Role};

    use super::*;

    #[test]
    fn endpoint_errors_map_to_exit_codes() {
        let denied = EndpointError::PermissionDenied {
            op: Operation::Write,
            role: Role::Subscriber,
        };
        assert_eq!(endpoint_error("write", denied).code, PERMISSION_DENIED);

        let bad_minor = EndpointError::NoDevice { minor: 9, count: 4 };
        let err = endpoint_error("open", bad_minor);
        assert_eq!(err.code, USAGE);
        assert_eq!(err.message, "open: no such minor 9 (device has 4)");
    }

    #[test]
    fn io_errors_map_to_exit_codes() {
        let err = io_error("read config", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.code, DATA_INVALID);
    }
}
