use std::fs;

use bytes::BytesMut;
use pubsub_endpoint::{ChannelStats, Device, DeviceConfig, Endpoint, Fd, Role};
use serde::Serialize;

use crate::cmd::FanoutArgs;
use crate::exit::{endpoint_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE};
use crate::output::{payload_preview, print_json, print_table, OutputFormat};

struct Subscriber {
    endpoint: Endpoint,
    received: BytesMut,
    reads: usize,
}

#[derive(Serialize)]
struct SubscriberReport {
    handle: Fd,
    role: Role,
    bytes: usize,
    reads: usize,
    matches: bool,
}

#[derive(Serialize)]
struct FanoutReport {
    minor: u32,
    payload_size: usize,
    payload: String,
    writes: usize,
    retries: usize,
    stats: ChannelStats,
    subscribers: Vec<SubscriberReport>,
}

pub fn run(args: FanoutArgs, format: OutputFormat, config: DeviceConfig) -> CliResult<i32> {
    if args.subscribers == 0 {
        return Err(CliError::new(USAGE, "--subscribers must be at least 1"));
    }
    let read_size = args.read_size.unwrap_or(config.channel.max_write_size);
    if read_size == 0 {
        return Err(CliError::new(USAGE, "--read-size must be greater than zero"));
    }
    let payload = resolve_payload(&args)?;

    let device = Device::with_config(config);
    let publisher = open_as(&device, args.minor, Role::Publisher)?;
    let mut subscribers = (0..args.subscribers)
        .map(|_| {
            Ok(Subscriber {
                endpoint: open_as(&device, args.minor, Role::Subscriber)?,
                received: BytesMut::with_capacity(payload.len()),
                reads: 0,
            })
        })
        .collect::<CliResult<Vec<_>>>()?;

    let mut writes = 0usize;
    let mut retries = 0usize;
    for chunk in payload.chunks(config.channel.max_write_size.max(1)) {
        loop {
            match publisher.write(chunk) {
                Ok(_) => {
                    writes += 1;
                    break;
                }
                Err(err) if err.is_retryable() => {
                    retries += 1;
                    if drain_all(&mut subscribers, read_size)? == 0 {
                        return Err(endpoint_error("write stalled", err));
                    }
                }
                Err(err) => return Err(endpoint_error("write failed", err)),
            }
        }
    }
    drain_all(&mut subscribers, read_size)?;
    tracing::info!(
        subscribers = subscribers.len(),
        writes,
        retries,
        bytes = payload.len(),
        "fan-out complete"
    );

    let reports: Vec<SubscriberReport> = subscribers
        .iter()
        .map(|sub| SubscriberReport {
            handle: sub.endpoint.id(),
            role: sub.endpoint.role(),
            bytes: sub.received.len(),
            reads: sub.reads,
            matches: sub.received.as_ref() == payload.as_slice(),
        })
        .collect();
    let all_match = reports.iter().all(|r| r.matches);
    let stats = device
        .stats(args.minor)
        .map_err(|err| endpoint_error("stats failed", err))?;

    let report = FanoutReport {
        minor: args.minor,
        payload_size: payload.len(),
        payload: payload_preview(&payload),
        writes,
        retries,
        stats,
        subscribers: reports,
    };
    print_report(&report, format);

    Ok(if all_match { SUCCESS } else { FAILURE })
}

fn open_as(device: &Device, minor: u32, role: Role) -> CliResult<Endpoint> {
    let endpoint = device
        .open_endpoint(minor)
        .map_err(|err| endpoint_error("open failed", err))?;
    endpoint
        .set_role(role)
        .map_err(|err| endpoint_error("set role failed", err))?;
    Ok(endpoint)
}

/// Read every subscriber until it would block. Returns bytes drained.
fn drain_all(subscribers: &mut [Subscriber], read_size: usize) -> CliResult<usize> {
    let mut total = 0usize;
    for sub in subscribers.iter_mut() {
        loop {
            match sub.endpoint.read(read_size) {
                Ok(chunk) => {
                    sub.reads += 1;
                    total += chunk.len();
                    sub.received.extend_from_slice(&chunk);
                }
                Err(err) if err.is_retryable() => break,
                Err(err) => {
                    return Err(CliError::new(
                        INTERNAL,
                        format!("read from handle {} failed: {err}", sub.endpoint.id()),
                    ))
                }
            }
        }
    }
    Ok(total)
}

fn resolve_payload(args: &FanoutArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data or --file is required"))
}

fn print_report(report: &FanoutReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            println!(
                "minor {}: {} bytes in {} writes ({} retries, {} buffered)",
                report.minor,
                report.payload_size,
                report.writes,
                report.retries,
                report.stats.buffered_bytes
            );
            print_table(
                &["HANDLE", "ROLE", "BYTES", "READS", "MATCH"],
                report.subscribers.iter().map(|s| {
                    vec![
                        s.handle.to_string(),
                        s.role.to_string(),
                        s.bytes.to_string(),
                        s.reads.to_string(),
                        s.matches.to_string(),
                    ]
                }),
            );
        }
        OutputFormat::Pretty => {
            println!("payload: {}", report.payload);
            for s in &report.subscribers {
                println!(
                    "handle={} bytes={} reads={} match={}",
                    s.handle, s.bytes, s.reads, s.matches
                );
            }
        }
        OutputFormat::Raw => {
            for s in &report.subscribers {
                println!("{} {}", s.handle, s.bytes);
            }
        }
    }
}
