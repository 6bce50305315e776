//! Canonical payload encoding.
//!
//! Records are stored as compact JSON: field-tagged, readable with any
//! database inspector, and stable across field reordering. Range queries
//! match type tags directly against these bytes, so the encoding must keep
//! enum tags as plain strings.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CodecError, Result};

/// Encodes a value to its canonical byte form.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(kind: &'static str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CodecError::Encode { kind, source: e }.into())
}

/// Decodes bytes produced by [`encode`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the bytes do not parse into `T`.
pub fn decode<T: DeserializeOwned>(kind: &'static str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode { kind, source: e }.into())
}

/// Rejects NaN and infinities, which JSON cannot represent.
///
/// # Errors
///
/// Returns [`CodecError::NonFiniteValue`] for non-finite values.
pub fn ensure_finite(value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CodecError::NonFiniteValue { value }.into())
    }
}

/// Returns true if `tag` occurs anywhere in `payload`. An empty tag matches
/// every payload.
pub fn contains_tag(payload: &[u8], tag: &[u8]) -> bool {
    if tag.is_empty() {
        return true;
    }
    payload.windows(tag.len()).any(|window| window == tag)
}
