use std::fmt;
use std::io;

use tagrpc_client::{CallError, ConnectError};
use tagrpc_filter::FilterError;
use tagrpc_frame::FrameError;
use tagrpc_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::ConnectTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn filter_error(context: &str, err: FilterError) -> CliError {
    match err {
        FilterError::InvalidLevel(_) | FilterError::Parse(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn connect_error(context: &str, err: ConnectError) -> CliError {
    match err {
        ConnectError::Transport(err) => transport_error(context, err),
        ConnectError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn call_error(context: &str, err: CallError) -> CliError {
    match err {
        CallError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        CallError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        CallError::Filter(err) => filter_error(context, err),
        CallError::Frame(err) => frame_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn refused_connect_is_transport_error() {
        let err = connect_error(
            "connect failed",
            ConnectError::Transport(TransportError::Connect {
                addr: "127.0.0.1:1".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("connect failed: "));
    }

    #[test]
    fn timeouts_map_to_timeout_code() {
        let connect = transport_error(
            "connect failed",
            TransportError::ConnectTimeout {
                addr: "10.0.0.1:80".to_string(),
                timeout: Duration::from_secs(1),
            },
        );
        assert_eq!(connect.code, TIMEOUT);

        let call = call_error("call failed", CallError::Timeout(Duration::from_millis(5)));
        assert_eq!(call.code, TIMEOUT);
    }

    #[test]
    fn payload_problems_are_data_invalid() {
        let err = call_error(
            "call failed",
            CallError::Frame(FrameError::PayloadTooLarge { size: 10, max: 1 }),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = call_error(
            "call failed",
            CallError::Filter(FilterError::OutputLimit {
                filter: "decompress",
                position: 0,
                max: 16,
            }),
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn closed_connection_is_plain_failure() {
        assert_eq!(call_error("call failed", CallError::ConnectionClosed).code, FAILURE);
        assert_eq!(call_error("call failed", CallError::TagInUse(1)).code, INTERNAL);
    }
}
