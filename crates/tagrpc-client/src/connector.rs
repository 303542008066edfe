use tagrpc_filter::Filter;
use tagrpc_transport::TcpEndpoint;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::ConnectError;

/// Connect to `addr` (`host:port`) with the given filter chains.
///
/// `outbound` runs over every request payload before framing, `inbound` over
/// every response payload after it is received.
pub async fn connect(
    addr: &str,
    outbound: impl IntoIterator<Item = Filter>,
    inbound: impl IntoIterator<Item = Filter>,
) -> Result<Connection, ConnectError> {
    let config = ConnectionConfig::default()
        .with_outbound_filters(outbound)
        .with_inbound_filters(inbound);
    connect_with_config(addr, config).await
}

/// [`connect`] with the filter arguments in incoming, outgoing order.
pub async fn create_connection(
    addr: &str,
    incoming: impl IntoIterator<Item = Filter>,
    outgoing: impl IntoIterator<Item = Filter>,
) -> Result<Connection, ConnectError> {
    connect(addr, outgoing, incoming).await
}

/// Connect with explicit configuration.
pub async fn connect_with_config(
    addr: &str,
    config: ConnectionConfig,
) -> Result<Connection, ConnectError> {
    config.validate()?;
    debug!(
        addr,
        timeout = ?config.connect_timeout,
        outbound = %config.outbound_filters,
        inbound = %config.inbound_filters,
        "connecting"
    );

    let stream = TcpEndpoint::connect_timeout(addr, config.connect_timeout).await?;
    let conn = Connection::from_stream(stream, config)?;

    info!(addr, peer = %conn.peer_addr(), "connection established");
    Ok(conn)
}
