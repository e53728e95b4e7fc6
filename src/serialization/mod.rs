//! Blob format and read-side decoding policy.
//!
//! Every value the facade writes is captured as a [`CacheValue`] and stored as
//! a tagged Postcard payload wrapped in a versioned envelope:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (varint) │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "TCAC"              u32            tagged CacheValue, nothing after it
//! ```
//!
//! The payload records the shape of the value, so reading a field back as a
//! different type fails instead of reinterpreting the bytes, and any reader can
//! enumerate a hash as `CacheValue`s regardless of the types it was written with.
//!
//! Reads go through [`decode_value`], which first recognises values stored as
//! plain decimal-integer text (written by other clients, or by `HINCRBY`) and
//! only then falls back to the blob format. A blob always starts with the magic,
//! so it never parses as an integer.
//!
//! # Example
//!
//! ```rust
//! use tenant_cache::serialization::{decode_value, serialize_for_cache};
//!
//! # fn main() -> tenant_cache::Result<()> {
//! let bytes = serialize_for_cache(&42i64)?;
//! assert_eq!(decode_value::<i64>(&bytes)?, 42);
//! assert_eq!(decode_value::<i64>(b"42")?, 42);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::value::{CacheValue, WireValue};
use serde::de::value::{Error as ValueError, I64Deserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};

/// Magic header for blob entries: b"TCAC"
pub const CACHE_MAGIC: [u8; 4] = *b"TCAC";

/// Current schema version.
///
/// Version 2 made the payload self-describing.
///
/// Increment when the envelope layout changes. Entries written under another
/// version are rejected on read, which the facade reports as a miss.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Versioned envelope around every blob.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"TCAC"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The cached value
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Envelope fields ahead of the payload; Postcard lays struct fields out back
/// to back, so this decodes the front of any `CacheEnvelope`.
#[derive(Deserialize)]
struct EnvelopeHeader {
    magic: [u8; 4],
    version: u32,
}

/// Serialize a value into blob bytes.
///
/// Serialization is deterministic for values without unordered sequences,
/// which is what lets the presence set deduplicate equal users.
///
/// # Errors
///
/// Returns `Error::SerializationError` if the value has no `CacheValue` form or
/// Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(WireValue::from(CacheValue::from_serialize(value)?));
    postcard::to_allocvec(&envelope).map_err(|e| {
        warn!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize blob bytes, validating magic and version.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
/// - `Error::DeserializationError`: Corrupted payload, trailing bytes, or a
///   stored value whose shape is not `T`'s
pub fn deserialize_from_cache<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (header, payload): (EnvelopeHeader, &[u8]) =
        postcard::take_from_bytes(bytes).map_err(corrupted)?;

    if header.magic != CACHE_MAGIC {
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, header.magic
        )));
    }

    if header.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, header.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: header.version,
        });
    }

    let (value, rest): (WireValue, &[u8]) =
        postcard::take_from_bytes(payload).map_err(corrupted)?;
    if !rest.is_empty() {
        debug!("Cache entry has {} trailing bytes", rest.len());
        return Err(Error::DeserializationError(format!(
            "{} trailing bytes after payload",
            rest.len()
        )));
    }

    CacheValue::from(value).into_typed()
}

fn corrupted(e: postcard::Error) -> Error {
    debug!("Cache deserialization failed: {}", e);
    Error::DeserializationError(e.to_string())
}

/// Parse stored bytes as base-10 integer text.
///
/// Accepts an optional sign and surrounding ASCII whitespace. Values outside
/// the `i64` range are not integers for this purpose.
pub fn parse_decimal_integer(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Decode a stored hash value.
///
/// Policy, in order:
/// 1. integer text, if `T` can be built from an integer;
/// 2. the blob format.
///
/// # Errors
///
/// Returns the blob decoding error when neither branch produces a `T`.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if let Some(n) = parse_decimal_integer(bytes) {
        let de: I64Deserializer<ValueError> = n.into_deserializer();
        if let Ok(value) = T::deserialize(de) {
            return Ok(value);
        }
    }

    deserialize_from_cache(bytes)
}
