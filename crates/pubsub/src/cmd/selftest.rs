use std::fmt::Debug;

use pubsub_endpoint::{
    Device, DeviceConfig, EndpointError, Fd, GET_TYPE, SET_TYPE, TYPE_NONE, TYPE_PUB, TYPE_SUB,
};
use serde::Serialize;

use crate::cmd::SelftestArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

const MINOR: u32 = 0;

type Check = fn(&Device) -> Result<(), String>;

const CHECKS: &[(&str, Check)] = &[
    ("fresh-handle-unassigned", fresh_handle_unassigned),
    ("publisher-role-sticks", publisher_role_sticks),
    ("publisher-read-denied", publisher_read_denied),
    ("small-write-accepted", small_write_accepted),
    ("oversized-write-rejected", oversized_write_rejected),
    ("role-set-once", role_set_once),
    ("invalid-role-tag", invalid_role_tag),
    ("unknown-command", unknown_command),
    ("unassigned-data-denied", unassigned_data_denied),
    ("subscriber-write-denied", subscriber_write_denied),
    ("empty-read-would-block", empty_read_would_block),
    ("fanout-two-subscribers", fanout_two_subscribers),
    ("short-read", short_read),
    ("publish-order", publish_order),
    ("close-isolation", close_isolation),
    ("closed-handle", closed_handle),
];

#[derive(Serialize)]
struct CheckResult {
    name: &'static str,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Serialize)]
struct SelftestReport {
    max_write_size: usize,
    max_queue_bytes: Option<usize>,
    passed: usize,
    failed: usize,
    checks: Vec<CheckResult>,
}

pub fn run(args: SelftestArgs, format: OutputFormat, config: DeviceConfig) -> CliResult<i32> {
    let mut checks = Vec::new();

    for &(name, check) in CHECKS {
        if let Some(filter) = &args.filter {
            if !name.contains(filter.as_str()) {
                continue;
            }
        }

        let device = Device::with_config(config);
        let outcome = check(&device);
        match &outcome {
            Ok(()) => tracing::debug!(check = name, "check passed"),
            Err(detail) => tracing::warn!(check = name, %detail, "check failed"),
        }

        let failed = outcome.is_err();
        checks.push(CheckResult {
            name,
            passed: !failed,
            detail: outcome.err(),
        });
        if failed && args.fail_fast {
            break;
        }
    }

    let failed = checks.iter().filter(|c| !c.passed).count();
    let report = SelftestReport {
        max_write_size: config.channel.max_write_size,
        max_queue_bytes: config.channel.max_queue_bytes,
        passed: checks.len() - failed,
        failed,
        checks,
    };
    print_report(&report, format);

    Ok(if failed == 0 { SUCCESS } else { FAILURE })
}

fn print_report(report: &SelftestReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            print_table(
                &["CHECK", "RESULT", "DETAIL"],
                report.checks.iter().map(|c| {
                    vec![
                        c.name.to_string(),
                        verdict(c.passed).to_string(),
                        c.detail.clone().unwrap_or_default(),
                    ]
                }),
            );
            println!("{} passed, {} failed", report.passed, report.failed);
        }
        OutputFormat::Pretty => {
            for c in &report.checks {
                match &c.detail {
                    Some(detail) => println!("{} {}: {detail}", verdict(c.passed), c.name),
                    None => println!("{} {}", verdict(c.passed), c.name),
                }
            }
            println!("{} passed, {} failed", report.passed, report.failed);
        }
        OutputFormat::Raw => println!("{}/{}", report.passed, report.checks.len()),
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn step<T>(result: Result<T, EndpointError>, what: &str) -> Result<T, String> {
    result.map_err(|err| format!("{what}: {err}"))
}

fn ensure(cond: bool, message: impl FnOnce() -> String) -> Result<(), String> {
    if cond {
        Ok(())
    } else {
        Err(message())
    }
}

fn expect_errno<T: Debug>(
    result: Result<T, EndpointError>,
    errno: i32,
    what: &str,
) -> Result<(), String> {
    match result {
        Err(err) if err.errno() == errno => Ok(()),
        Err(err) => Err(format!(
            "{what}: expected {}, got {} ({err})",
            errno_name(errno),
            errno_name(err.errno())
        )),
        Ok(value) => Err(format!(
            "{what}: expected {}, got Ok({value:?})",
            errno_name(errno)
        )),
    }
}

fn errno_name(errno: i32) -> &'static str {
    match errno {
        libc::EPERM => "EPERM",
        libc::EINVAL => "EINVAL",
        libc::EAGAIN => "EAGAIN",
        libc::ENOTTY => "ENOTTY",
        libc::EBADF => "EBADF",
        libc::ENXIO => "ENXIO",
        _ => "errno",
    }
}

fn open_as(dev: &Device, tag: u64) -> Result<Fd, String> {
    let fd = step(dev.open(MINOR), "open")?;
    step(dev.ioctl(fd, SET_TYPE, tag), "SET_TYPE")?;
    Ok(fd)
}

fn read_len(dev: &Device, fd: Fd, len: usize) -> Result<usize, String> {
    let mut buf = vec![0u8; len];
    step(dev.read(fd, &mut buf), "read")
}

/// Read `fd` until it would block, appending everything to `out`.
fn drain_into(dev: &Device, fd: Fd, out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    while let Ok(n) = dev.read(fd, &mut buf) {
        out.extend_from_slice(&buf[..n]);
    }
}

fn fresh_handle_unassigned(dev: &Device) -> Result<(), String> {
    let fd = step(dev.open(MINOR), "open")?;
    let tag = step(dev.ioctl(fd, GET_TYPE, 0), "GET_TYPE")?;
    ensure(tag == TYPE_NONE, || format!("GET_TYPE returned {tag}"))
}

fn publisher_role_sticks(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_PUB)?;
    let tag = step(dev.ioctl(fd, GET_TYPE, 0), "GET_TYPE")?;
    ensure(tag == TYPE_PUB, || format!("GET_TYPE returned {tag}"))
}

fn publisher_read_denied(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_PUB)?;
    let mut buf = [0u8; 100];
    expect_errno(dev.read(fd, &mut buf), libc::EPERM, "publisher read")
}

fn small_write_accepted(dev: &Device) -> Result<(), String> {
    let payload = &b"hello"[..5usize.min(dev.config().channel.max_write_size)];
    let fd = open_as(dev, TYPE_PUB)?;
    let n = step(dev.write(fd, payload), "write")?;
    ensure(n == payload.len(), || format!("write returned {n}"))
}

fn oversized_write_rejected(dev: &Device) -> Result<(), String> {
    // Every length fits under a usize::MAX limit.
    let Some(oversize) = dev.config().channel.max_write_size.checked_add(1) else {
        return Ok(());
    };
    let publisher = open_as(dev, TYPE_PUB)?;
    let subscriber = open_as(dev, TYPE_SUB)?;

    let payload = vec![b'X'; oversize];
    expect_errno(dev.write(publisher, &payload), libc::EINVAL, "oversized write")?;

    let pending = step(dev.endpoint(subscriber), "lookup")?.pending();
    ensure(pending == 0, || format!("{pending} bytes leaked to subscriber"))
}

fn role_set_once(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_PUB)?;
    expect_errno(dev.ioctl(fd, SET_TYPE, TYPE_SUB), libc::EPERM, "second SET_TYPE")?;
    let tag = step(dev.ioctl(fd, GET_TYPE, 0), "GET_TYPE")?;
    ensure(tag == TYPE_PUB, || format!("role changed to {tag}"))
}

fn invalid_role_tag(dev: &Device) -> Result<(), String> {
    let fd = step(dev.open(MINOR), "open")?;
    expect_errno(dev.ioctl(fd, SET_TYPE, 999), libc::EINVAL, "SET_TYPE 999")
}

fn unknown_command(dev: &Device) -> Result<(), String> {
    let fd = step(dev.open(MINOR), "open")?;
    expect_errno(dev.ioctl(fd, 9999, 0), libc::ENOTTY, "ioctl 9999")
}

fn unassigned_data_denied(dev: &Device) -> Result<(), String> {
    let fd = step(dev.open(MINOR), "open")?;
    let mut buf = [0u8; 50];
    expect_errno(dev.read(fd, &mut buf), libc::EPERM, "unassigned read")?;
    expect_errno(dev.write(fd, b"x"), libc::EPERM, "unassigned write")
}

fn subscriber_write_denied(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_SUB)?;
    expect_errno(dev.write(fd, b"Invalid write"), libc::EPERM, "subscriber write")
}

fn empty_read_would_block(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_SUB)?;
    let mut buf = [0u8; 50];
    expect_errno(dev.read(fd, &mut buf), libc::EAGAIN, "empty read")
}

fn fanout_two_subscribers(dev: &Device) -> Result<(), String> {
    let chunk = 700usize.min(dev.config().channel.max_write_size);
    let publisher = open_as(dev, TYPE_PUB)?;
    let sub_b = open_as(dev, TYPE_SUB)?;
    let sub_c = open_as(dev, TYPE_SUB)?;

    let written = step(dev.write(publisher, &vec![b'A'; chunk]), "write")?;
    ensure(written == chunk, || format!("write returned {written}"))?;

    for (label, fd) in [("B", sub_b), ("C", sub_c)] {
        let n = read_len(dev, fd, chunk)?;
        ensure(n == chunk, || format!("subscriber {label} read {n} of {chunk}"))?;
    }
    Ok(())
}

fn short_read(dev: &Device) -> Result<(), String> {
    let chunk = 700usize.min(dev.config().channel.max_write_size);
    let first = chunk * 5 / 7;
    let second = chunk * 3 / 7;
    let expected = second.min(chunk - first);

    let publisher = open_as(dev, TYPE_PUB)?;
    let sub = open_as(dev, TYPE_SUB)?;
    step(dev.write(publisher, &vec![b'A'; chunk]), "write")?;
    read_len(dev, sub, chunk)?;
    step(dev.write(publisher, &vec![b'B'; chunk]), "write")?;

    let n = read_len(dev, sub, first)?;
    ensure(n == first, || format!("first read returned {n} of {first}"))?;
    let n = read_len(dev, sub, second)?;
    ensure(n == expected, || {
        format!("second read returned {n}, expected {expected}")
    })
}

fn publish_order(dev: &Device) -> Result<(), String> {
    let publisher = open_as(dev, TYPE_PUB)?;
    let sub = open_as(dev, TYPE_SUB)?;
    let limit = dev.config().channel.max_write_size;
    let parts: [&[u8]; 3] = [b"first ", b"second ", b"third"];
    let mut out = Vec::new();
    for part in parts {
        for piece in part.chunks(limit.max(1)) {
            step(dev.write(publisher, piece), "write")?;
            drain_into(dev, sub, &mut out);
        }
    }

    ensure(out == parts.concat(), || {
        format!("read back {:?}", String::from_utf8_lossy(&out))
    })
}

fn close_isolation(dev: &Device) -> Result<(), String> {
    let size = 3usize.min(dev.config().channel.max_write_size);
    let (before, after) = (&b"abc"[..size], &b"def"[..size]);
    let publisher = open_as(dev, TYPE_PUB)?;
    let keep = open_as(dev, TYPE_SUB)?;
    let gone = open_as(dev, TYPE_SUB)?;

    let mut out = Vec::new();
    step(dev.write(publisher, before), "write")?;
    drain_into(dev, keep, &mut out);
    step(dev.close(gone), "close")?;
    step(dev.write(publisher, after), "write")?;
    drain_into(dev, keep, &mut out);

    ensure(out == [before, after].concat(), || {
        format!("remaining subscriber read {:?}", String::from_utf8_lossy(&out))
    })
}

fn closed_handle(dev: &Device) -> Result<(), String> {
    let fd = open_as(dev, TYPE_PUB)?;
    step(dev.close(fd), "close")?;
    expect_errno(dev.write(fd, b"x"), libc::EBADF, "write after close")
}

#[cfg(test)]
mod tests {
    use pubsub_endpoint::ChannelConfig;

    use super::*;

    #[test]
    fn every_check_passes_on_default_device() {
        for &(name, check) in CHECKS {
            let device = Device::with_config(DeviceConfig::default());
            assert_eq!(check(&device), Ok(()), "check {name} failed");
        }
    }

    #[test]
    fn checks_follow_a_custom_write_limit() {
        let config = DeviceConfig {
            channel: ChannelConfig::default().with_max_write_size(1000),
            minor_count: 1,
        };
        for &(name, check) in CHECKS {
            let device = Device::with_config(config);
            assert_eq!(check(&device), Ok(()), "check {name} failed");
        }
    }

    #[test]
    fn checks_follow_bounded_queues() {
        let config = DeviceConfig {
            channel: ChannelConfig::default()
                .with_max_write_size(4)
                .with_max_queue_bytes(4),
            minor_count: 1,
        };
        for &(name, check) in CHECKS {
            let device = Device::with_config(config);
            assert_eq!(check(&device), Ok(()), "check {name} failed");
        }
    }

    #[test]
    fn unlimited_write_size_does_not_overflow() {
        let config = DeviceConfig {
            channel: ChannelConfig::default().with_max_write_size(usize::MAX),
            minor_count: 1,
        };
        let device = Device::with_config(config);
        assert_eq!(oversized_write_rejected(&device), Ok(()));
    }

    #[test]
    fn expect_errno_reports_mismatch() {
        let err = expect_errno::<usize>(Ok(3), libc::EPERM, "write").unwrap_err();
        assert_eq!(err, "write: expected EPERM, got Ok(3)");
    }
}
