//! Length-prefixed frame codec for the tagrpc wire protocol.
//!
//! Every message on the wire is framed with:
//! - A 4-byte little-endian payload length
//! - A 4-byte little-endian correlation tag
//!
//! followed by exactly `length` payload bytes. Decoding tolerates arbitrary
//! split points; a frame is either fully buffered or left untouched.

pub mod codec;
pub mod error;
pub mod tag;
#[cfg(feature = "async")]
pub mod tag_codec;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use tag::method_tag;
#[cfg(feature = "async")]
pub use tag_codec::TagCodec;
