//! pubsub-ffi: C-ABI exports for the pubsub device.
//!
//! Calls mirror the character-device syscalls: non-negative return values
//! are results, negative values are `-errno`. A human-readable message for
//! the most recent failure on the calling thread is available from
//! [`ps_last_error`].

mod args;
mod device;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use device::{
    ps_close, ps_device_free, ps_device_new, ps_ioctl, ps_open, ps_pending, ps_read, ps_write,
};
pub use types::{
    PsDeviceHandle, PS_GET_TYPE, PS_MAX_WRITE_SIZE, PS_SET_TYPE, PS_TYPE_NONE, PS_TYPE_PUB,
    PS_TYPE_SUB,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn ps_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
