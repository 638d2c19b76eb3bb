use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use pubsub_endpoint::EndpointError;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

/// Record `message` and return `-EINVAL`.
pub(crate) fn invalid_argument(message: impl Into<String>) -> i64 {
    set_error_message(message);
    -i64::from(libc::EINVAL)
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

/// Record `err` and return its negated errno.
pub(crate) fn endpoint_errno(err: &EndpointError) -> i64 {
    set_error_message(err.to_string());
    -i64::from(err.errno())
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
