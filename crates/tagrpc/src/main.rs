mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::{CliError, INTERNAL};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tagrpc", version, about = "Tag-correlated RPC diagnostics CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime startup failed: {err}")))
        .and_then(|runtime| runtime.block_on(cmd::run(cli.command, format)));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_tag() {
        let cli = Cli::try_parse_from([
            "tagrpc",
            "call",
            "127.0.0.1:20776",
            "--tag",
            "3647565230",
            "--data",
            "hello",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.tag, Some(3_647_565_230));
                assert_eq!(args.data.as_deref(), Some("hello"));
                assert!(args.compress.is_none());
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn bare_compress_uses_default_level() {
        let cli = Cli::try_parse_from([
            "tagrpc",
            "call",
            "127.0.0.1:1",
            "--tag",
            "0x10",
            "--compress",
        ])
        .expect("bare --compress should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.tag, Some(16));
                assert_eq!(args.compress, Some(6));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "tagrpc",
            "call",
            "127.0.0.1:1",
            "--tag",
            "1",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn requires_exactly_one_tag_source() {
        let missing = Cli::try_parse_from(["tagrpc", "call", "127.0.0.1:1", "--data", "x"])
            .expect_err("a tag source is required");
        assert_eq!(missing.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let both = Cli::try_parse_from([
            "tagrpc",
            "call",
            "127.0.0.1:1",
            "--tag",
            "1",
            "--hashes",
            "1,2",
        ])
        .expect_err("tag sources are exclusive");
        assert_eq!(both.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn method_requires_table() {
        let err = Cli::try_parse_from(["tagrpc", "call", "127.0.0.1:1", "--method", "Put"])
            .expect_err("--method without --table should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_echo_with_defaults() {
        let cli = Cli::try_parse_from(["tagrpc", "echo"]).expect("echo should parse");
        match cli.command {
            Command::Echo(args) => {
                assert_eq!(args.addr, "127.0.0.1:20776");
                assert!(args.count.is_none());
            }
            other => panic!("expected echo, got {other:?}"),
        }
    }
}
