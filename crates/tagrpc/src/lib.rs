//! Multiplexed RPC over a single TCP connection.
//!
//! Many concurrent calls share one socket; each request and response frame
//! carries a correlation tag derived from the remote method, and a background
//! task routes every response to the call waiting on its tag.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP endpoint resolution, connect timeout, stream wrapper
//! - [`frame`]: length-prefixed, tag-carrying frame codec
//! - [`filter`]: ordered payload filter chains (identity, zlib)
//! - [`client`]: the connection engine and typed method calls (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use tagrpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tagrpc_frame::*;
}

/// Re-export filter types.
pub mod filter {
    pub use tagrpc_filter::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use tagrpc_client::*;
}
