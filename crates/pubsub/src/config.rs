use std::fs;
use std::path::Path;

use pubsub_endpoint::{DeviceConfig, MAX_MINOR_COUNT};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

// Larger files are certainly not a device config.
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Largest per-write limit the CLI accepts.
pub const MAX_WRITE_SIZE_CEILING: usize = 16 * 1024 * 1024;

/// Flag overrides applied on top of the config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigOverrides {
    pub max_write_size: Option<usize>,
    pub max_queue_bytes: Option<usize>,
    pub minor_count: Option<u32>,
}

pub fn load_device_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> CliResult<DeviceConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => DeviceConfig::default(),
    };

    if let Some(max_write_size) = overrides.max_write_size {
        config.channel.max_write_size = max_write_size;
    }
    if let Some(max_queue_bytes) = overrides.max_queue_bytes {
        config.channel.max_queue_bytes = Some(max_queue_bytes);
    }
    if let Some(minor_count) = overrides.minor_count {
        config.minor_count = minor_count;
    }

    validate(&config)?;
    tracing::debug!(?config, "device config resolved");
    Ok(config)
}

fn read_config_file(path: &Path) -> CliResult<DeviceConfig> {
    let context = format!("failed reading {}", path.display());
    let meta = fs::metadata(path).map_err(|err| io_error(&context, err))?;
    if meta.len() > MAX_CONFIG_FILE_SIZE {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "{context}: file too large ({} bytes, max {MAX_CONFIG_FILE_SIZE})",
                meta.len()
            ),
        ));
    }

    let raw = fs::read(path).map_err(|err| io_error(&context, err))?;
    serde_json::from_slice(&raw).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("{} is not a valid device config: {err}", path.display()),
        )
    })
}

fn validate(config: &DeviceConfig) -> CliResult<()> {
    if config.channel.max_write_size == 0 {
        return Err(CliError::new(USAGE, "max write size must be greater than zero"));
    }
    if config.channel.max_write_size > MAX_WRITE_SIZE_CEILING {
        return Err(CliError::new(
            USAGE,
            format!(
                "max write size ({}) must be at most {MAX_WRITE_SIZE_CEILING}",
                config.channel.max_write_size
            ),
        ));
    }
    if config.minor_count == 0 {
        return Err(CliError::new(USAGE, "minor count must be greater than zero"));
    }
    if config.minor_count > MAX_MINOR_COUNT {
        return Err(CliError::new(
            USAGE,
            format!(
                "minor count ({}) must be at most {MAX_MINOR_COUNT}",
                config.minor_count
            ),
        ));
    }
    if let Some(max_queue_bytes) = config.channel.max_queue_bytes {
        if max_queue_bytes < config.channel.max_write_size {
            return Err(CliError::new(
                USAGE,
                format!(
                    "max queue bytes ({max_queue_bytes}) must be at least the max write size ({})",
                    config.channel.max_write_size
                ),
            ));
        }
    }
    Ok(())
}
