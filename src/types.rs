//! Records persisted by the store and rows returned to callers.

use serde::{Deserialize, Serialize};

/// Free-form user metadata. Values are tagged JSON variants
/// (string, number, bool, array, object, null).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Size in bytes of one stored vector component.
pub const F32_BYTES: u64 = std::mem::size_of::<f32>() as u64;

/// Where an id's vector lives in the vector file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Byte offset into the vector file
    pub position: u64,
    /// Number of f32 components
    pub dim: usize,
}

impl VectorRecord {
    pub fn new(position: u64, dim: usize) -> Self {
        Self { position, dim }
    }

    /// Number of bytes the vector occupies in the file
    pub fn byte_len(&self) -> u64 {
        self.dim as u64 * F32_BYTES
    }

    /// Offset of the first byte after this vector
    pub fn end(&self) -> u64 {
        self.position + self.byte_len()
    }
}

/// The metadata blob persisted per id: the caller's un-normalized input
/// vector kept next to (not inside) the user's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub original_vector: Vec<f32>,
    #[serde(default)]
    pub fields: Metadata,
}

/// A stored vector joined with its metadata, as returned by a full scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: String,
    /// The normalized vector read from the vector file
    pub vector: Vec<f32>,
    /// The vector exactly as it was upserted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_vector: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// A search result containing the vector ID and its cosine similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub vector: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_extent() {
        let record = VectorRecord::new(512, 64);
        assert_eq!(record.byte_len(), 256);
        assert_eq!(record.end(), 768);
    }

    #[test]
    fn test_stored_metadata_keeps_fields_separate() {
        let mut fields = Metadata::new();
        fields.insert("label".into(), serde_json::json!("cat"));
        fields.insert("tags".into(), serde_json::json!(["a", "b"]));

        let stored = StoredMetadata {
            original_vector: vec![3.0, 4.0],
            fields,
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["original_vector"], serde_json::json!([3.0, 4.0]));
        assert_eq!(json["fields"]["label"], "cat");
        assert!(json["fields"].get("original_vector").is_none());
    }
}
