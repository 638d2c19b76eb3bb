use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pubsub_channel::{BroadcastChannel, ChannelStats};

use crate::config::{DeviceConfig, MAX_MINOR_COUNT};
use crate::control::ControlCommand;
use crate::endpoint::Endpoint;
use crate::error::{EndpointError, Result};

/// Descriptor number of an open handle.
pub type Fd = u64;

// 0-2 are left to stdio so descriptors read naturally in harness output.
const FIRST_FD: Fd = 3;

/// A set of independent broadcast channels addressed by minor number, plus
/// a descriptor table of open handles.
///
/// A minor's channel is created the first time it is used. Each `Device` is
/// self-contained; two devices never share channels or handles.
#[derive(Debug)]
pub struct Device {
    config: DeviceConfig,
    channels: Mutex<HashMap<u32, Arc<BroadcastChannel>>>,
    handles: Mutex<HashMap<Fd, Arc<Endpoint>>>,
    next_fd: AtomicU64,
}

impl Device {
    /// Create a device with default configuration.
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default())
    }

    /// Create a device with explicit configuration.
    ///
    /// A minor count above [`MAX_MINOR_COUNT`] is clamped to it.
    pub fn with_config(mut config: DeviceConfig) -> Self {
        if config.minor_count > MAX_MINOR_COUNT {
            tracing::warn!(
                requested = config.minor_count,
                max = MAX_MINOR_COUNT,
                "minor count clamped"
            );
            config.minor_count = MAX_MINOR_COUNT;
        }
        tracing::debug!(
            minors = config.minor_count,
            max_write_size = config.channel.max_write_size,
            "device created"
        );
        Self {
            config,
            channels: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            next_fd: AtomicU64::new(FIRST_FD),
        }
    }

    /// Device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Open a handle on `minor` and register it in the descriptor table.
    pub fn open(&self, minor: u32) -> Result<Fd> {
        let endpoint = self.open_endpoint(minor)?;
        let fd = endpoint.id();
        self.lock_handles().insert(fd, Arc::new(endpoint));
        Ok(fd)
    }

    /// Open a handle on `minor` as an owned value outside the descriptor table.
    pub fn open_endpoint(&self, minor: u32) -> Result<Endpoint> {
        let channel = self.channel(minor)?;
        let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
        Ok(Endpoint::new(fd, minor, channel))
    }

    /// Execute a raw control command on `fd`.
    pub fn ioctl(&self, fd: Fd, cmd: u32, arg: u64) -> Result<u64> {
        let endpoint = self.endpoint(fd)?;
        let command = ControlCommand::decode(cmd, arg)?;
        endpoint.control(command)
    }

    /// Read into `buf` from subscriber `fd`.
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.endpoint(fd)?.read_into(buf)
    }

    /// Broadcast `data` from publisher `fd`.
    pub fn write(&self, fd: Fd, data: &[u8]) -> Result<usize> {
        self.endpoint(fd)?.write(data)
    }

    /// Close `fd`. Its queue stops receiving before this returns.
    pub fn close(&self, fd: Fd) -> Result<()> {
        let endpoint = self
            .lock_handles()
            .remove(&fd)
            .ok_or(EndpointError::BadHandle(fd))?;
        // Another thread may still hold a clone mid-call; unregister now
        // rather than when the last clone drops.
        endpoint.release();
        Ok(())
    }

    /// Borrow a table entry as a shared endpoint.
    pub fn endpoint(&self, fd: Fd) -> Result<Arc<Endpoint>> {
        self.lock_handles()
            .get(&fd)
            .cloned()
            .ok_or(EndpointError::BadHandle(fd))
    }

    /// Number of descriptors currently open.
    pub fn open_handles(&self) -> usize {
        self.lock_handles().len()
    }

    /// Counters for the channel behind `minor`.
    pub fn stats(&self, minor: u32) -> Result<ChannelStats> {
        Ok(self.channel(minor)?.stats())
    }

    fn channel(&self, minor: u32) -> Result<Arc<BroadcastChannel>> {
        if minor >= self.config.minor_count {
            return Err(EndpointError::NoDevice {
                minor,
                count: self.config.minor_count,
            });
        }
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = channels
            .entry(minor)
            .or_insert_with(|| Arc::new(BroadcastChannel::with_config(self.config.channel)));
        Ok(Arc::clone(channel))
    }

    fn lock_handles(&self) -> MutexGuard<'_, HashMap<Fd, Arc<Endpoint>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
