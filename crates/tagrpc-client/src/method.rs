//! Typed method boundary on top of the raw `call(payload, tag)` core.
//!
//! Generated or hand-written wrappers describe each remote method with a
//! [`Method`] impl; [`invoke`] encodes the request, issues the call on the
//! method's tag and decodes the response. [`MethodTable`] is the runtime
//! equivalent for callers that only know method names.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tagrpc_frame::method_tag;

use crate::connection::Connection;
use crate::error::MethodError;
use crate::response::CallStatus;

/// Conversion of a request value into payload bytes.
pub trait EncodePayload {
    fn encode_payload(&self) -> Result<Bytes, MethodError>;
}

/// Conversion of response payload bytes into a value.
pub trait DecodePayload: Sized {
    fn decode_payload(payload: Bytes) -> Result<Self, MethodError>;
}

impl EncodePayload for Bytes {
    fn encode_payload(&self) -> Result<Bytes, MethodError> {
        Ok(self.clone())
    }
}

impl DecodePayload for Bytes {
    fn decode_payload(payload: Bytes) -> Result<Self, MethodError> {
        Ok(payload)
    }
}

impl EncodePayload for Vec<u8> {
    fn encode_payload(&self) -> Result<Bytes, MethodError> {
        Ok(Bytes::copy_from_slice(self))
    }
}

impl DecodePayload for Vec<u8> {
    fn decode_payload(payload: Bytes) -> Result<Self, MethodError> {
        Ok(payload.to_vec())
    }
}

impl EncodePayload for String {
    fn encode_payload(&self) -> Result<Bytes, MethodError> {
        Ok(Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl DecodePayload for String {
    fn decode_payload(payload: Bytes) -> Result<Self, MethodError> {
        String::from_utf8(payload.to_vec()).map_err(|e| MethodError::Decode(e.to_string()))
    }
}

/// JSON payload encoding via `serde_json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> EncodePayload for Json<T> {
    fn encode_payload(&self) -> Result<Bytes, MethodError> {
        serde_json::to_vec(&self.0)
            .map(Bytes::from)
            .map_err(|e| MethodError::Encode(e.to_string()))
    }
}

impl<T: DeserializeOwned> DecodePayload for Json<T> {
    fn decode_payload(payload: Bytes) -> Result<Self, MethodError> {
        serde_json::from_slice(&payload)
            .map(Json)
            .map_err(|e| MethodError::Decode(e.to_string()))
    }
}

/// Static description of one remote method.
pub trait Method {
    const NAME: &'static str;
    const HASH_A: u32;
    const HASH_B: u32;

    type Request: EncodePayload;
    type Response: DecodePayload;

    /// Correlation tag for this method.
    fn tag() -> u32 {
        method_tag(Self::HASH_A, Self::HASH_B)
    }
}

/// Call method `M` with `request` and decode its response.
pub async fn invoke<M: Method>(
    conn: &Connection,
    request: &M::Request,
) -> Result<(M::Response, CallStatus), MethodError> {
    let payload = request.encode_payload()?;
    let (payload, status) = conn.call(payload, M::tag()).await?.into_parts();
    let response = M::Response::decode_payload(payload)?;
    Ok((response, status))
}

/// Method names mapped to their `(hash_a, hash_b)` pairs.
///
/// Serialized as a plain JSON object: `{"Put": [3735928559, 130339649]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodTable {
    methods: BTreeMap<String, [u32; 2]>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, name: impl Into<String>, hash_a: u32, hash_b: u32) {
        self.methods.insert(name.into(), [hash_a, hash_b]);
    }

    /// Add the entry for a statically described method.
    pub fn register<M: Method>(&mut self) {
        self.insert(M::NAME, M::HASH_A, M::HASH_B);
    }

    pub fn hashes(&self, name: &str) -> Option<(u32, u32)> {
        self.methods.get(name).map(|[a, b]| (*a, *b))
    }

    /// Correlation tag for `name`, if known.
    pub fn tag(&self, name: &str) -> Option<u32> {
        self.hashes(name).map(|(a, b)| method_tag(a, b))
    }

    /// Reverse lookup. Distinct methods may share a tag; the first by name wins.
    pub fn name_of(&self, tag: u32) -> Option<&str> {
        self.methods
            .iter()
            .find(|(_, [a, b])| method_tag(*a, *b) == tag)
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
