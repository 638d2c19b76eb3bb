use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table<S: ToString>(header: &[&str], rows: impl IntoIterator<Item = Vec<S>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row.iter().map(ToString::to_string).collect::<Vec<_>>());
    }
    println!("{table}");
}

/// Short printable form of a payload: text as-is, binary as a size marker.
pub fn payload_preview(payload: &[u8]) -> String {
    const MAX_PREVIEW: usize = 48;

    match std::str::from_utf8(payload) {
        Ok(text) if text.chars().count() > MAX_PREVIEW => {
            let head: String = text.chars().take(MAX_PREVIEW).collect();
            format!("{head}...")
        }
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
