use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use puppetry_notation::Value;
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

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    pump: Option<&'a str>,
    message: serde_json::Value,
    notation: String,
    timestamp: String,
}

pub fn print_message(message: &Value, format: OutputFormat) {
    let pump = message.get("pump").and_then(Value::as_str);
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: message.kind(),
                pump,
                message: serde_json::Value::from(message),
                notation: message.to_string(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "PUMP", "MESSAGE"])
                .add_row(vec![
                    message.kind().to_string(),
                    pump.unwrap_or("-").to_string(),
                    message.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let json = serde_json::Value::from(message);
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_else(|_| message.to_string())
            );
        }
        OutputFormat::Raw => {
            println!("{message}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
