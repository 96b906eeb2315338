//! Serialization utilities: bincode for index records, JSON for metadata/config.

use crate::error::{Result, VectorDbError};
use crate::types::{StoredMetadata, VectorRecord};
use serde::{Deserialize, Serialize};

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| VectorDbError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| VectorDbError::SerializationError(e.to_string()))
}

/// Encode data to JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| VectorDbError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| VectorDbError::SerializationError(e.to_string()))
}

pub fn encode_record(record: &VectorRecord) -> Result<Vec<u8>> {
    to_bincode(record)
}

pub fn decode_record(bytes: &[u8]) -> Result<VectorRecord> {
    from_bincode(bytes)
}

/// Metadata is JSON because its values are dynamically typed, which bincode
/// cannot decode.
pub fn encode_metadata(metadata: &StoredMetadata) -> Result<Vec<u8>> {
    to_json(metadata)
}

pub fn decode_metadata(bytes: &[u8]) -> Result<StoredMetadata> {
    from_json(bytes)
}
