//! File names inside a data directory.

use std::path::{Path, PathBuf};

/// Shard addressed by the engine. Only one vector file is in use.
pub const PRIMARY_SHARD: u32 = 0;

#[derive(Debug, Clone)]
pub struct Layout {
    base_path: PathBuf,
}

impl Layout {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Raw f32 vector file for a shard.
    pub fn vector_file(&self, shard: u32) -> PathBuf {
        self.base_path.join(format!("shard_{}.bin", shard))
    }

    /// The key-value store holding index records and metadata.
    pub fn meta_db(&self) -> PathBuf {
        self.base_path.join("metadata.redb")
    }
}
