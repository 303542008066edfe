use std::fs;
use std::time::Duration;

use tagrpc_client::{connect_with_config, ConnectionConfig, MethodTable};
use tagrpc_filter::Filter;
use tagrpc_frame::method_tag;
use tracing::debug;

use crate::cmd::{parse_u32, CallArgs};
use crate::exit::{
    call_error, connect_error, filter_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS,
    USAGE,
};
use crate::output::{print_response, OutputFormat};

pub async fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let (tag, method) = resolve_tag(&args)?;
    let payload = resolve_payload(&args)?;
    let config = build_config(&args)?;

    let conn = connect_with_config(&args.addr, config)
        .await
        .map_err(|err| connect_error("connect failed", err))?;

    debug!(tag, size = payload.len(), "issuing call");
    let result = conn.call(payload, tag).await;
    conn.close().await;
    conn.wait_closed().await;

    let response = result.map_err(|err| call_error("call failed", err))?;
    print_response(&response, method.as_deref(), conn.peer_addr(), format);
    Ok(SUCCESS)
}

fn build_config(args: &CallArgs) -> CliResult<ConnectionConfig> {
    let mut config =
        ConnectionConfig::default().with_connect_timeout(parse_duration(&args.connect_timeout)?);

    if let Some(timeout) = &args.timeout {
        config = config.with_call_timeout(parse_duration(timeout)?);
    }

    if let Some(level) = args.compress {
        let compress = Filter::compress(level).map_err(|err| filter_error("--compress", err))?;
        config = config
            .with_outbound_filters([compress])
            .with_inbound_filters([Filter::decompress()]);
    }

    Ok(config)
}

/// Work out the correlation tag and, when looked up by name, the method name.
fn resolve_tag(args: &CallArgs) -> CliResult<(u32, Option<String>)> {
    if let Some(tag) = args.tag {
        return Ok((tag, None));
    }
    if let Some(hashes) = &args.hashes {
        let (a, b) = parse_hashes(hashes)?;
        return Ok((method_tag(a, b), None));
    }
    if let Some(name) = &args.method {
        let path = args
            .table
            .as_ref()
            .ok_or_else(|| CliError::new(USAGE, "--method requires --table"))?;
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        let table = MethodTable::from_json(&text).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("{} is not a valid method table: {err}", path.display()),
            )
        })?;
        let tag = table.tag(name).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("method '{name}' not found in {}", path.display()),
            )
        })?;
        return Ok((tag, Some(name.clone())));
    }
    Err(CliError::new(
        USAGE,
        "one of --tag, --hashes or --method is required",
    ))
}

fn parse_hashes(input: &str) -> CliResult<(u32, u32)> {
    let (a, b) = input
        .split_once(',')
        .ok_or_else(|| CliError::new(USAGE, format!("--hashes expects A,B, got '{input}'")))?;
    let a = parse_u32(a).map_err(|err| CliError::new(USAGE, format!("--hashes: {err}")))?;
    let b = parse_u32(b).map_err(|err| CliError::new(USAGE, format!("--hashes: {err}")))?;
    Ok((a, b))
}

fn resolve_payload(args: &CallArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
