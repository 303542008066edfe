//! Correlation tag derivation.
//!
//! The interface compiler bakes two 32-bit hashes of each method name into
//! the generated wrapper. The tag routed on the wire is their XOR; the frame
//! layer and the connection engine treat it as an opaque key.

/// Derive the wire correlation tag for a method from its two hashes.
pub const fn method_tag(hash_a: u32, hash_b: u32) -> u32 {
    hash_a ^ hash_b
}
