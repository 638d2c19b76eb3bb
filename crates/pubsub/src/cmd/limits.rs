use pubsub_endpoint::{DeviceConfig, GET_TYPE, SET_TYPE, TYPE_NONE, TYPE_PUB, TYPE_SUB};
use serde::Serialize;

use crate::cmd::LimitsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct ControlCode {
    name: &'static str,
    cmd: String,
}

#[derive(Serialize)]
struct RoleTag {
    name: &'static str,
    value: u64,
}

#[derive(Serialize)]
struct LimitsOutput {
    max_write_size: usize,
    max_queue_bytes: Option<usize>,
    minor_count: u32,
    controls: Vec<ControlCode>,
    roles: Vec<RoleTag>,
}

pub fn run(_args: LimitsArgs, format: OutputFormat, config: DeviceConfig) -> CliResult<i32> {
    let out = LimitsOutput {
        max_write_size: config.channel.max_write_size,
        max_queue_bytes: config.channel.max_queue_bytes,
        minor_count: config.minor_count,
        controls: vec![
            ControlCode {
                name: "SET_TYPE",
                cmd: format!("{SET_TYPE:#06x}"),
            },
            ControlCode {
                name: "GET_TYPE",
                cmd: format!("{GET_TYPE:#06x}"),
            },
        ],
        roles: vec![
            RoleTag {
                name: "TYPE_NONE",
                value: TYPE_NONE,
            },
            RoleTag {
                name: "TYPE_PUB",
                value: TYPE_PUB,
            },
            RoleTag {
                name: "TYPE_SUB",
                value: TYPE_SUB,
            },
        ],
    };

    print_limits(&out, format);
    Ok(SUCCESS)
}

fn print_limits(out: &LimitsOutput, format: OutputFormat) {
    let queue = out
        .max_queue_bytes
        .map_or_else(|| "unbounded".to_string(), |n| n.to_string());

    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut rows = vec![
                vec!["max_write_size".to_string(), out.max_write_size.to_string()],
                vec!["max_queue_bytes".to_string(), queue],
                vec!["minor_count".to_string(), out.minor_count.to_string()],
            ];
            rows.extend(out.controls.iter().map(|c| vec![c.name.to_string(), c.cmd.clone()]));
            rows.extend(
                out.roles
                    .iter()
                    .map(|r| vec![r.name.to_string(), r.value.to_string()]),
            );
            print_table(&["LIMIT", "VALUE"], rows);
        }
        OutputFormat::Pretty => {
            println!("Device Limits:");
            println!("  Max write size:   {} bytes", out.max_write_size);
            println!("  Max queue bytes:  {queue}");
            println!("  Minors:           {}", out.minor_count);
            for c in &out.controls {
                println!("  {:<17} {}", format!("{}:", c.name), c.cmd);
            }
        }
        OutputFormat::Raw => println!("{}", out.max_write_size),
    }
}
