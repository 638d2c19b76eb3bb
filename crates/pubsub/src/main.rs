mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::config::{load_device_config, ConfigOverrides};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pubsub", version, about = "Broadcast pub/sub device CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Device config file (JSON).
    #[arg(long, value_name = "FILE", global = true, env = "PUBSUB_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum bytes accepted per write.
    #[arg(long, value_name = "BYTES", global = true)]
    max_write_size: Option<usize>,

    /// Bound each subscriber queue to this many buffered bytes.
    #[arg(long, value_name = "BYTES", global = true)]
    max_queue_bytes: Option<usize>,

    /// Number of minors (independent channels).
    #[arg(long, value_name = "N", global = true)]
    minors: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let overrides = ConfigOverrides {
        max_write_size: cli.max_write_size,
        max_queue_bytes: cli.max_queue_bytes,
        minor_count: cli.minors,
    };
    let result = load_device_config(cli.config.as_deref(), overrides)
        .and_then(|config| cmd::run(cli.command, format, config));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
