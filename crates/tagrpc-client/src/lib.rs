//! Multiplexed, tag-correlated RPC connection engine.
//!
//! One [`Connection`] carries many concurrent calls over a single TCP socket.
//! Each call is framed with its method's correlation tag; a background task
//! reads response frames and routes each to the call waiting on that tag.
//! Payloads pass through configurable [`Filter`](tagrpc_filter::Filter)
//! chains on the way out and on the way in.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use tagrpc_client::connect;
//! use tagrpc_filter::Filter;
//!
//! let conn = connect("127.0.0.1:20776", [Filter::Identity], [Filter::Identity]).await?;
//! let response = conn.call(&b"request"[..], 3_647_565_230).await?;
//! assert!(response.status.is_success());
//! conn.close().await;
//! conn.wait_closed().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
mod gate;
pub mod method;
pub mod pending;
pub mod response;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use connector::{connect, connect_with_config, create_connection};
pub use error::{CallError, ConnectError, MethodError, Result};
pub use method::{invoke, DecodePayload, EncodePayload, Json, Method, MethodTable};
pub use pending::{PendingSlot, PendingTable};
pub use response::{CallStatus, Response};
