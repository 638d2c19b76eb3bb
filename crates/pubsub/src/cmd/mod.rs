use clap::{Args, Subcommand};
use pubsub_endpoint::DeviceConfig;
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod fanout;
pub mod limits;
pub mod selftest;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the device behaviour checks against an in-process device.
    Selftest(SelftestArgs),
    /// Publish a payload to N subscribers and verify every copy.
    Fanout(FanoutArgs),
    /// Print the effective limits and control command numbers.
    Limits(LimitsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: DeviceConfig) -> CliResult<i32> {
    match command {
        Command::Selftest(args) => selftest::run(args, format, config),
        Command::Fanout(args) => fanout::run(args, format, config),
        Command::Limits(args) => limits::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SelftestArgs {
    /// Only run checks whose name contains this text.
    #[arg(long)]
    pub filter: Option<String>,
    /// Stop after the first failing check.
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args, Debug)]
pub struct FanoutArgs {
    /// Number of subscriber handles to open.
    #[arg(long, short = 's', default_value = "2")]
    pub subscribers: usize,
    /// Minor number to use.
    #[arg(long, default_value = "0")]
    pub minor: u32,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Largest single read issued per subscriber. Default: the write limit.
    #[arg(long)]
    pub read_size: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct LimitsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
