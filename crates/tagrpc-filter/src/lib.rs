//! Payload filter pipeline.
//!
//! A filter is a symmetric encode/decode transform over payload bytes. A
//! connection applies its outbound chain before framing and its inbound chain
//! after demultiplexing. Chains run left to right in both directions, so the
//! peer's outbound chain must mirror this side's inbound chain; that symmetry
//! is a configuration contract and is never checked at runtime.

pub mod chain;
pub mod error;
pub mod filter;

pub use chain::{decode_chain, encode_chain, FilterChain};
pub use error::{FilterError, Result};
pub use filter::{
    Filter, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_DECOMPRESSED, MAX_COMPRESSION_LEVEL,
};
