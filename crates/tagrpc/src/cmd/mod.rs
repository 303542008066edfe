use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod echo;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Issue one call and print the response.
    Call(CallArgs),
    /// Run a diagnostic peer that reflects every frame back on its tag.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format).await,
        Command::Echo(args) => echo::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["tag", "hashes", "method"])))]
pub struct CallArgs {
    /// Endpoint address (host:port).
    #[arg(env = "TAGRPC_ADDR")]
    pub addr: String,
    /// Correlation tag (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u32)]
    pub tag: Option<u32>,
    /// Method hash pair `A,B`; the tag is `A ^ B`.
    #[arg(long, value_name = "A,B")]
    pub hashes: Option<String>,
    /// Method name to look up in --table.
    #[arg(long, requires = "table")]
    pub method: Option<String>,
    /// JSON method table: {"Name": [hash_a, hash_b], ...}.
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// zlib-compress the request and inflate the response (level 0-10).
    #[arg(long, value_name = "LEVEL", num_args = 0..=1, default_missing_value = "6")]
    pub compress: Option<u8>,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
    /// Response timeout (e.g. 5s, 500ms). Default: wait indefinitely.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind (host:port). Port 0 picks a free port.
    #[arg(default_value = "127.0.0.1:20776")]
    pub addr: String,
    /// Exit after echoing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a `u32` written in decimal or as `0x`-prefixed hex.
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse::<u32>(),
    };
    parsed.map_err(|_| format!("'{input}' is not a u32 (decimal or 0x hex)"))
}
