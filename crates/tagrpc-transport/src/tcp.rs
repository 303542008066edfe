use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::RpcStream;

/// Default time allowed for resolving and connecting to an endpoint.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport.
///
/// Provides bind/accept/connect over `host:port` endpoints. Connect attempts
/// walk every resolved address in order and stop at the first success.
pub struct TcpEndpoint {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpEndpoint {
    /// Bind and listen on a `host:port` address.
    ///
    /// Port `0` asks the OS for an ephemeral port; see [`TcpEndpoint::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: addr.to_string(),
                source: e,
            })?;
        let bound = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        info!(addr = %bound, "listening on tcp endpoint");

        Ok(Self {
            listener,
            addr: bound,
        })
    }

    /// Accept an incoming connection.
    pub async fn accept(&self) -> Result<RpcStream> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(RpcStream::from_tcp(stream, peer))
    }

    /// Connect to a listening endpoint using [`DEFAULT_CONNECT_TIMEOUT`].
    pub async fn connect(addr: &str) -> Result<RpcStream> {
        Self::connect_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to a listening endpoint, giving up after `timeout`.
    ///
    /// The timeout covers name resolution and every connect attempt.
    pub async fn connect_timeout(addr: &str, timeout: Duration) -> Result<RpcStream> {
        match tokio::time::timeout(timeout, connect_any(addr)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectTimeout {
                addr: addr.to_string(),
                timeout,
            }),
        }
    }

    /// The address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

async fn connect_any(addr: &str) -> Result<RpcStream> {
    let candidates: Vec<SocketAddr> = lookup_host(addr)
        .await
        .map_err(|e| TransportError::Resolve {
            addr: addr.to_string(),
            source: e,
        })?
        .collect();

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect(candidate).await {
            Ok(stream) => {
                debug!(addr, peer = %candidate, "connected to tcp endpoint");
                return Ok(RpcStream::from_tcp(stream, candidate));
            }
            Err(err) => {
                debug!(addr, peer = %candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    match last_err {
        Some(source) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source,
        }),
        None => Err(TransportError::NoAddress {
            addr: addr.to_string(),
        }),
    }
}
