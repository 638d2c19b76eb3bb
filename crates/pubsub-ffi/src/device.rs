use pubsub_endpoint::{ChannelConfig, Device, DeviceConfig, DEFAULT_MINOR_COUNT, MAX_MINOR_COUNT};

use crate::args;
use crate::error;
use crate::types::PsDeviceHandle;

fn with_device<T>(handle: PsDeviceHandle, on_error: T, f: impl FnOnce(&Device) -> T) -> T {
    if handle.is_null() {
        let _ = error::invalid_argument("device handle cannot be null");
        return on_error;
    }

    let device = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *const Device) }
    };

    f(device)
}

fn bad_handle() -> i64 {
    -i64::from(libc::EBADF)
}

/// Create a device with `minor_count` channels and a per-write limit of
/// `max_write_size` bytes. Zero selects the default for either value.
/// Returns null if `minor_count` exceeds `MAX_MINOR_COUNT`.
#[no_mangle]
pub extern "C" fn ps_device_new(minor_count: u32, max_write_size: usize) -> PsDeviceHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        if minor_count > MAX_MINOR_COUNT {
            error::set_error_message(format!(
                "minor count {minor_count} exceeds {MAX_MINOR_COUNT}"
            ));
            return std::ptr::null_mut();
        }

        let mut channel = ChannelConfig::default();
        if max_write_size > 0 {
            channel = channel.with_max_write_size(max_write_size);
        }
        let config = DeviceConfig {
            channel,
            minor_count: if minor_count == 0 {
                DEFAULT_MINOR_COUNT
            } else {
                minor_count
            },
        };

        Box::into_raw(Box::new(Device::with_config(config))) as PsDeviceHandle
    })
}

/// Free a device and close every descriptor still open on it.
///
/// # Safety
/// `device` must be null or a handle returned by `ps_device_new`, not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn ps_device_free(device: PsDeviceHandle) {
    crate::ffi_boundary((), || {
        if device.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by ps_device_new.
        unsafe {
            drop(Box::from_raw(device as *mut Device));
        }
    });
}

/// Open a handle on `minor`. Returns the descriptor or `-errno`.
///
/// # Safety
/// `device` must be a valid handle returned by `ps_device_new`.
#[no_mangle]
pub unsafe extern "C" fn ps_open(device: PsDeviceHandle, minor: u32) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        with_device(device, -i64::from(libc::EINVAL), |dev| {
            match dev.open(minor) {
                Ok(fd) => i64::try_from(fd).unwrap_or(i64::MAX),
                Err(err) => error::endpoint_errno(&err),
            }
        })
    })
}

/// Run control command `cmd` with argument `arg`. Returns the command's
/// value (`0` for `PS_SET_TYPE`, the role tag for `PS_GET_TYPE`) or `-errno`.
///
/// # Safety
/// `device` must be a valid handle returned by `ps_device_new`.
#[no_mangle]
pub unsafe extern "C" fn ps_ioctl(device: PsDeviceHandle, fd: i64, cmd: u32, arg: u64) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        let Some(fd) = args::fd_arg(fd) else {
            return bad_handle();
        };

        with_device(device, -i64::from(libc::EINVAL), |dev| {
            match dev.ioctl(fd, cmd, arg) {
                Ok(value) => i64::try_from(value).unwrap_or(i64::MAX),
                Err(err) => error::endpoint_errno(&err),
            }
        })
    })
}

/// Read up to `len` bytes into `buf`. Returns the byte count or `-errno`
/// (`-EAGAIN` when nothing is buffered).
///
/// # Safety
/// `device` must be a valid handle. If `len > 0`, `buf` must be writable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ps_read(device: PsDeviceHandle, fd: i64, buf: *mut u8, len: usize) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        let Some(fd) = args::fd_arg(fd) else {
            return bad_handle();
        };
        let out = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_out_arg(buf, len, "buf") } {
                Some(v) => v,
                None => return -i64::from(libc::EFAULT),
            }
        };

        with_device(device, -i64::from(libc::EINVAL), |dev| {
            match dev.read(fd, out) {
                Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
                Err(err) => error::endpoint_errno(&err),
            }
        })
    })
}

/// Broadcast `len` bytes from `data`. Returns the byte count or `-errno`.
///
/// # Safety
/// `device` must be a valid handle. If `len > 0`, `data` must be readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ps_write(
    device: PsDeviceHandle,
    fd: i64,
    data: *const u8,
    len: usize,
) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        let Some(fd) = args::fd_arg(fd) else {
            return bad_handle();
        };
        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(data, len, "data") } {
                Some(v) => v,
                None => return -i64::from(libc::EFAULT),
            }
        };

        with_device(device, -i64::from(libc::EINVAL), |dev| {
            match dev.write(fd, payload) {
                Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
                Err(err) => error::endpoint_errno(&err),
            }
        })
    })
}

/// Bytes buffered for subscriber `fd` (0 for other roles), or `-errno`.
///
/// # Safety
/// `device` must be a valid handle returned by `ps_device_new`.
#[no_mangle]
pub unsafe extern "C" fn ps_pending(device: PsDeviceHandle, fd: i64) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        let Some(fd) = args::fd_arg(fd) else {
            return bad_handle();
        };

        with_device(device, -i64::from(libc::EINVAL), |dev| {
            match dev.endpoint(fd) {
                Ok(endpoint) => i64::try_from(endpoint.pending()).unwrap_or(i64::MAX),
                Err(err) => error::endpoint_errno(&err),
            }
        })
    })
}

/// Close `fd`. Returns 0 or `-errno`.
///
/// # Safety
/// `device` must be a valid handle returned by `ps_device_new`.
#[no_mangle]
pub unsafe extern "C" fn ps_close(device: PsDeviceHandle, fd: i64) -> i64 {
    crate::ffi_boundary(-i64::from(libc::EIO), || {
        error::clear_error_state();

        let Some(fd) = args::fd_arg(fd) else {
            return bad_handle();
        };

        with_device(device, -i64::from(libc::EINVAL), |dev| match dev.close(fd) {
            Ok(()) => 0,
            Err(err) => error::endpoint_errno(&err),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;
    use crate::types::{PS_GET_TYPE, PS_SET_TYPE, PS_TYPE_NONE, PS_TYPE_PUB, PS_TYPE_SUB};

    fn last_error() -> String {
        // SAFETY: ps_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(crate::ps_last_error()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn c_style_session() {
        let dev = ps_device_new(0, 0);
        assert!(!dev.is_null());

        // SAFETY: `dev` is a live handle from ps_device_new; buffers outlive each call.
        unsafe {
            let publisher = ps_open(dev, 0);
            let subscriber = ps_open(dev, 0);
            assert!(publisher >= 0 && subscriber >= 0);

            assert_eq!(ps_ioctl(dev, publisher, PS_GET_TYPE, 0), PS_TYPE_NONE as i64);
            assert_eq!(ps_ioctl(dev, publisher, PS_SET_TYPE, PS_TYPE_PUB), 0);
            assert_eq!(ps_ioctl(dev, subscriber, PS_SET_TYPE, PS_TYPE_SUB), 0);

            let mut buf = [0u8; 64];
            assert_eq!(
                ps_read(dev, publisher, buf.as_mut_ptr(), buf.len()),
                -i64::from(libc::EPERM)
            );
            assert_eq!(
                ps_read(dev, subscriber, buf.as_mut_ptr(), buf.len()),
                -i64::from(libc::EAGAIN)
            );
            assert_eq!(last_error(), "no data available");

            assert_eq!(ps_write(dev, publisher, b"hello".as_ptr(), 5), 5);
            assert_eq!(ps_pending(dev, subscriber), 5);
            assert_eq!(ps_read(dev, subscriber, buf.as_mut_ptr(), 3), 3);
            assert_eq!(&buf[..3], b"hel");
            assert_eq!(ps_read(dev, subscriber, buf.as_mut_ptr(), 64), 2);

            let big = vec![b'X'; 1050];
            assert_eq!(
                ps_write(dev, publisher, big.as_ptr(), big.len()),
                -i64::from(libc::EINVAL)
            );

            assert_eq!(ps_ioctl(dev, publisher, 9999, 0), -i64::from(libc::ENOTTY));
            assert_eq!(ps_close(dev, publisher), 0);
            assert_eq!(ps_close(dev, publisher), -i64::from(libc::EBADF));
            assert_eq!(ps_close(dev, subscriber), 0);

            ps_device_free(dev);
        }
    }

    #[test]
    fn null_arguments_are_rejected() {
        // SAFETY: null handles and pointers are validated before use.
        unsafe {
            assert_eq!(ps_open(std::ptr::null_mut(), 0), -i64::from(libc::EINVAL));
            assert_eq!(last_error(), "device handle cannot be null");

            let dev = ps_device_new(1, 0);
            let fd = ps_open(dev, 0);
            ps_ioctl(dev, fd, PS_SET_TYPE, PS_TYPE_PUB);
            assert_eq!(ps_write(dev, fd, std::ptr::null(), 4), -i64::from(libc::EFAULT));
            assert_eq!(ps_write(dev, -1, b"x".as_ptr(), 1), -i64::from(libc::EBADF));
            assert_eq!(ps_open(dev, 1), -i64::from(libc::ENXIO));

            ps_device_free(dev);
            ps_device_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn excessive_minor_count_is_refused() {
        let dev = ps_device_new(u32::MAX, 0);
        assert!(dev.is_null());
        assert_eq!(last_error(), format!("minor count {} exceeds 1048576", u32::MAX));
    }

    #[test]
    fn null_buffer_reports_fault() {
        let dev = ps_device_new(1, 0);

        // SAFETY: `dev` is a live handle; null pointers are validated before use.
        unsafe {
            let fd = ps_open(dev, 0);
            ps_ioctl(dev, fd, PS_SET_TYPE, PS_TYPE_SUB);
            assert_eq!(ps_read(dev, fd, std::ptr::null_mut(), 8), -i64::from(libc::EFAULT));
            assert_eq!(last_error(), "bad address: buf is null with len 8");
            ps_device_free(dev);
        }
    }

    #[test]
    fn custom_write_limit() {
        let dev = ps_device_new(1, 1000);

        // SAFETY: `dev` is a live handle from ps_device_new.
        unsafe {
            let fd = ps_open(dev, 0);
            ps_ioctl(dev, fd, PS_SET_TYPE, PS_TYPE_PUB);
            let data = vec![0u8; 1001];
            assert_eq!(ps_write(dev, fd, data.as_ptr(), 1000), 1000);
            assert_eq!(ps_write(dev, fd, data.as_ptr(), 1001), -i64::from(libc::EINVAL));
            ps_device_free(dev);
        }
    }
}
