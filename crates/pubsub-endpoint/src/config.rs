use pubsub_channel::ChannelConfig;
use serde::{Deserialize, Serialize};

/// Number of independent channels a device exposes by default.
pub const DEFAULT_MINOR_COUNT: u32 = 256;

/// Largest minor count a device accepts, the width of a Linux minor number.
pub const MAX_MINOR_COUNT: u32 = 1 << 20;

/// Device-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Limits applied to every minor's channel.
    pub channel: ChannelConfig,
    /// Number of minors (independent channels). Default: 256.
    pub minor_count: u32,
}

impl DeviceConfig {
    /// Replace the per-channel limits.
    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    /// Override the number of minors.
    pub fn with_minor_count(mut self, minor_count: u32) -> Self {
        self.minor_count = minor_count;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            minor_count: DEFAULT_MINOR_COUNT,
        }
    }
}
