use std::time::Duration;

use tagrpc_filter::{Filter, FilterChain};
use tagrpc_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use tagrpc_transport::DEFAULT_CONNECT_TIMEOUT;

use crate::error::ConnectError;

/// Configuration for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Time allowed for resolving and connecting. Default: 5 seconds.
    pub connect_timeout: Duration,
    /// Per-call response deadline. Default: `None` (wait until a response
    /// arrives or the connection closes).
    pub call_timeout: Option<Duration>,
    /// Maximum frame payload size in either direction. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Disable Nagle's algorithm on the socket. Default: true.
    pub nodelay: bool,
    /// Stages applied to request payloads, left to right.
    pub outbound_filters: FilterChain,
    /// Stages applied to response payloads, left to right.
    pub inbound_filters: FilterChain,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            nodelay: true,
            outbound_filters: FilterChain::new(),
            inbound_filters: FilterChain::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_outbound_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.outbound_filters = filters.into_iter().collect();
        self
    }

    pub fn with_inbound_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.inbound_filters = filters.into_iter().collect();
        self
    }

    /// Frame codec settings derived from this config.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConnectError> {
        if self.connect_timeout.is_zero() {
            return Err(ConnectError::InvalidConfig(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConnectError::InvalidConfig(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_payload_size == 0 {
            return Err(ConnectError::InvalidConfig(
                "max_payload_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
        assert!(cfg.call_timeout.is_none());
        assert_eq!(cfg.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert!(cfg.nodelay);
        assert!(cfg.outbound_filters.is_empty());
        assert!(cfg.inbound_filters.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builders_apply() {
        let cfg = ConnectionConfig::default()
            .with_connect_timeout(Duration::from_millis(250))
            .with_call_timeout(Duration::from_secs(1))
            .with_max_payload_size(1024)
            .with_nodelay(false)
            .with_outbound_filters([Filter::Compress { level: 3 }])
            .with_inbound_filters(vec![Filter::decompress()]);

        assert_eq!(cfg.connect_timeout, Duration::from_millis(250));
        assert_eq!(cfg.call_timeout, Some(Duration::from_secs(1)));
        assert_eq!(cfg.frame_config().max_payload_size, 1024);
        assert!(!cfg.nodelay);
        assert_eq!(cfg.outbound_filters.names(), vec!["compress"]);
        assert_eq!(cfg.inbound_filters.names(), vec!["decompress"]);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(ConnectionConfig::default()
            .with_connect_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ConnectionConfig::default()
            .with_call_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ConnectionConfig::default()
            .with_max_payload_size(0)
            .validate()
            .is_err());
    }
}
