use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tagrpc_client::Response;

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
struct ResponseOutput<'a> {
    tag: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    status: String,
    status_code: u32,
    payload_size: usize,
    payload: String,
    elapsed_ms: f64,
    peer: String,
    timestamp: String,
}

pub fn print_response(
    response: &Response,
    method: Option<&str>,
    peer: SocketAddr,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                tag: response.tag,
                method,
                status: response.status.to_string(),
                status_code: response.status.code(),
                payload_size: response.payload.len(),
                payload: payload_preview(response.payload.as_ref()),
                elapsed_ms: response.elapsed.as_secs_f64() * 1000.0,
                peer: peer.to_string(),
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
                .set_header(vec!["TAG", "METHOD", "STATUS", "SIZE", "ELAPSED", "PAYLOAD"])
                .add_row(vec![
                    response.tag.to_string(),
                    method.unwrap_or("-").to_string(),
                    response.status.to_string(),
                    response.payload.len().to_string(),
                    format!("{:.1?}", response.elapsed),
                    payload_preview(response.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "tag={} ({}) status={} size={} elapsed={:.1?} peer={} payload={}",
                response.tag,
                method.unwrap_or("-"),
                response.status,
                response.payload.len(),
                response.elapsed,
                peer,
                payload_preview(response.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(response.payload.as_ref());
        }
    }
}

#[derive(Serialize)]
struct ListeningOutput {
    listening: String,
}

/// Announce the bound address on stdout so scripts can connect to it.
pub fn print_listening(addr: SocketAddr, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                listening: addr.to_string(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        _ => println!("{addr}"),
    }
    let _ = std::io::stdout().flush();
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
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
