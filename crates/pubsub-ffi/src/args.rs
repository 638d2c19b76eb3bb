use crate::error;

/// Convert a byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        error::set_error_message(format!("bad address: {name} is null with len {len}"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Convert an output byte pointer + length into a mutable slice.
///
/// # Safety
/// If `len > 0`, `buf` must be non-null and writable for `len` bytes.
pub(crate) unsafe fn bytes_out_arg<'a>(
    buf: *mut u8,
    len: usize,
    name: &str,
) -> Option<&'a mut [u8]> {
    if len == 0 {
        return Some(&mut []);
    }
    if buf.is_null() {
        error::set_error_message(format!("bad address: {name} is null with len {len}"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts_mut(buf, len) })
}

/// Convert a signed descriptor into the device's descriptor type.
pub(crate) fn fd_arg(fd: i64) -> Option<pubsub_endpoint::Fd> {
    if fd < 0 {
        error::set_error_message(format!("bad handle {fd}"));
        return None;
    }
    Some(fd as pubsub_endpoint::Fd)
}
