//! TCP transport for the tagrpc client runtime.
//!
//! Resolves `host:port` endpoints, connects with a bounded timeout and hands
//! back an [`RpcStream`] that the connection engine splits into its read and
//! write halves. A small [`TcpEndpoint`] listener is provided for diagnostic
//! peers and tests.
//!
//! This is the lowest layer of tagrpc. Everything else builds on top of
//! the [`RpcStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::RpcStream;
pub use tcp::{TcpEndpoint, DEFAULT_CONNECT_TIMEOUT};
