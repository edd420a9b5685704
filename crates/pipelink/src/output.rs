use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

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

/// One received message as printed by `peer`.
#[derive(Serialize)]
struct MessageOutput<'a> {
    session: &'a str,
    seq: u64,
    size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_message(payload: &[u8], session: &str, seq: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", message_json(payload, session, seq)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "SIZE", "SESSION", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    payload.len().to_string(),
                    session.to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} size={} session={} payload={}",
                seq,
                payload.len(),
                session,
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn message_json(payload: &[u8], session: &str, seq: u64) -> String {
    let out = MessageOutput {
        session,
        seq,
        size: payload.len(),
        payload: payload_preview(payload),
        timestamp: now_unix_seconds(),
    };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_line_carries_payload_and_session() {
        let line = message_json(b"hello", "left", 3);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["session"], "left");
        assert_eq!(value["seq"], 3);
        assert_eq!(value["size"], 5);
        assert_eq!(value["payload"], "hello");
    }

    #[test]
    fn binary_payloads_are_summarised() {
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
        assert_eq!(payload_preview(b""), "");
    }
}
