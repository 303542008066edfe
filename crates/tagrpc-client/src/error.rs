use std::time::Duration;

use tagrpc_filter::FilterError;
use tagrpc_frame::FrameError;
use tagrpc_transport::TransportError;

/// Errors that can occur while establishing a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Resolution, refusal, unreachable address or connect timeout.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The connection configuration is unusable.
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced to a single `call()`.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The connection was or became closed while the call was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// An outbound or inbound filter stage failed for this call's payload.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// The call's frame could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No response arrived within the configured per-call timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The tag already has an outstanding registration.
    #[error("tag {0} already has an outstanding call")]
    TagInUse(u32),
}

/// Errors from a typed method invocation.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    /// The underlying call failed.
    #[error(transparent)]
    Call(#[from] CallError),

    /// The request could not be turned into payload bytes.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// The response payload could not be turned into the response type.
    #[error("response decode failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, CallError>;
