use std::fmt;
use std::time::Duration;

use bytes::Bytes;

/// Opaque status delivered alongside a response payload.
///
/// The wire frame carries no status field, so the engine reports
/// [`CallStatus::OK`] for every delivered frame; failures surface as
/// [`CallError`](crate::CallError) instead. The numeric form keeps room for
/// protocol-defined codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallStatus(u32);

impl CallStatus {
    /// A response frame was delivered for the call.
    pub const OK: CallStatus = CallStatus(0);

    pub const fn from_code(code: u32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "ok")
        } else {
            write!(f, "status {}", self.0)
        }
    }
}

/// The result of a successful `call()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response bytes after the inbound filter chain.
    pub payload: Bytes,
    pub status: CallStatus,
    /// Correlation tag the response arrived on.
    pub tag: u32,
    /// Time from registration to delivery.
    pub elapsed: Duration,
}

impl Response {
    /// Split into the `(bytes, status)` pair.
    pub fn into_parts(self) -> (Bytes, CallStatus) {
        (self.payload, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_is_success() {
        assert!(CallStatus::OK.is_success());
        assert_eq!(CallStatus::OK.code(), 0);
        assert_eq!(CallStatus::OK.to_string(), "ok");
        assert!(!CallStatus::from_code(3).is_success());
        assert_eq!(CallStatus::from_code(3).to_string(), "status 3");
    }

    #[test]
    fn into_parts_splits_payload_and_status() {
        let response = Response {
            payload: Bytes::from_static(b"ok"),
            status: CallStatus::OK,
            tag: 1,
            elapsed: Duration::ZERO,
        };
        let (payload, status) = response.into_parts();
        assert_eq!(payload.as_ref(), b"ok");
        assert_eq!(status, CallStatus::OK);
    }
}
