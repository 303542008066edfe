use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// A connected RPC stream.
///
/// This is the fundamental I/O type returned by transport operations. The
/// connection engine consumes it with [`RpcStream::into_split`] so the read
/// half can live in the receive task while the write half sits behind the
/// write lock.
pub struct RpcStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl RpcStream {
    pub(crate) fn from_tcp(inner: TcpStream, peer: SocketAddr) -> Self {
        Self { inner, peer }
    }

    /// Remote address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of this end of the stream.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    /// Enable or disable Nagle's algorithm on the underlying socket.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Whether Nagle's algorithm is disabled.
    pub fn nodelay(&self) -> Result<bool> {
        self.inner.nodelay().map_err(Into::into)
    }

    /// Split into independently owned read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.inner.into_split()
    }

    /// Borrow the underlying tokio stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    /// Consume the wrapper and return the tokio stream.
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl std::fmt::Debug for RpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcStream")
            .field("type", &"tcp")
            .field("peer", &self.peer)
            .finish()
    }
}
