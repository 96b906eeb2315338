//! Storage engine: keeps the vector file and the index/metadata store
//! consistent and runs brute-force k-NN search over them.
//!
//! ## Write ordering
//!
//! Vector bytes always reach the file before the index record that points at
//! them is committed. A crash in between leaves unreferenced bytes at the
//! tail, never a record pointing past end-of-file.
//!
//! ## Locking
//!
//! - Every mutation of an id holds that id's lock stripe, so updates to the
//!   same id never interleave.
//! - Inserts additionally hold the tail lock across append and index write,
//!   so two new ids can never claim the same offset.
//! - Lock order is stripe(s) then tail; `delete_all` takes every stripe in
//!   index order first.
//!
//! Reads take no engine locks.

use crate::distance::{cosine_similarity, l2_norm, normalize};
use crate::error::{IoContext, Result, VectorDbError};
use crate::persistence::serialization::{decode_metadata, encode_metadata};
use crate::persistence::{IndexStore, Layout, VectorFile, INDEX_PREFIX, PRIMARY_SHARD};
use crate::types::{Metadata, SearchResult, StoredMetadata, StoredVector, VectorRecord};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration for the storage engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// fsync the vector file after every write.
    pub sync_writes: bool,
    /// Number of per-id lock stripes.
    pub lock_stripes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_writes: true,
            lock_stripes: 64,
        }
    }
}

/// Disk-backed vector store. `Send + Sync`; share it behind an `Arc`.
pub struct Engine {
    vectors: VectorFile,
    index: IndexStore,
    /// Offset the next insert is expected to land at.
    tail: Mutex<u64>,
    id_locks: Box<[Mutex<()>]>,
}

impl Engine {
    /// Open or create a database in `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).io_context("create data directory", data_dir)?;

        let layout = Layout::new(data_dir);
        let vectors = VectorFile::new(layout.vector_file(PRIMARY_SHARD), config.sync_writes);
        let index = IndexStore::open(layout.meta_db())?;

        let indexed_tail = index.next_tail_position(0)?;
        let file_len = vectors.len()?;
        if file_len < indexed_tail {
            // Unsynced bytes lost in a crash. Zero-fill so the gap stays
            // owned by its records and is never handed out again.
            warn!(
                file_len,
                indexed_tail,
                path = %vectors.path().display(),
                "index records point past the end of the vector file; extending it"
            );
            vectors.extend_to(indexed_tail)?;
        }
        let tail = file_len.max(indexed_tail);

        let stripes = config.lock_stripes.max(1);
        let id_locks = (0..stripes).map(|_| Mutex::new(())).collect();

        info!(
            data_dir = %data_dir.display(),
            records = index.count()?,
            tail,
            "opened vector engine"
        );

        Ok(Self {
            vectors,
            index,
            tail: Mutex::new(tail),
            id_locks,
        })
    }

    fn id_lock(&self, id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        let slot = (hasher.finish() % self.id_locks.len() as u64) as usize;
        &self.id_locks[slot]
    }

    /// Insert or update a vector. Returns `true` if `id` already existed.
    ///
    /// The stored vector is normalized; the raw input is kept alongside the
    /// metadata. An update must keep the existing dimension.
    pub fn upsert(&self, id: &str, vector: &[f32], metadata: Metadata) -> Result<bool> {
        validate_id(id)?;
        let normalized = normalize(vector)?;
        let blob = encode_metadata(&StoredMetadata {
            original_vector: vector.to_vec(),
            fields: metadata,
        })?;

        let _id_guard = self.id_lock(id).lock();

        let is_update = match self.index.find_index(id)? {
            Some(existing) => {
                if vector.len() != existing.dim {
                    return Err(VectorDbError::DimensionMismatch {
                        expected: existing.dim,
                        actual: vector.len(),
                    });
                }
                self.vectors.write_at(&normalized, existing.position)?;
                self.index.put_metadata(id, &blob)?;
                true
            }
            None => {
                self.insert_new(id, &normalized, &blob)?;
                false
            }
        };

        debug!(id, dim = vector.len(), is_update, "upserted vector");
        Ok(is_update)
    }

    /// Allocate a tail slot, write the vector there, then commit its
    /// metadata and index record. Caller holds the id's stripe.
    fn insert_new(&self, id: &str, normalized: &[f32], blob: &[u8]) -> Result<VectorRecord> {
        let mut tail = self.tail.lock();

        // Appending below the tail would land inside records whose bytes
        // went missing after open.
        let file_len = self.vectors.len()?;
        if file_len < *tail {
            warn!(
                file_len,
                tail = *tail,
                "vector file shorter than allocated tail; extending it"
            );
            self.vectors.extend_to(*tail)?;
        }

        let position = self.vectors.append(normalized)?;
        if position != *tail {
            // Bytes from a crashed or failed append sit past the last record.
            warn!(
                expected = *tail,
                actual = position,
                "vector file tail drifted; allocating at end of file"
            );
        }

        let record = VectorRecord::new(position, normalized.len());
        *tail = record.end();

        self.index.put_entry(id, &record, blob)?;
        Ok(record)
    }

    /// Remove a vector and its metadata. Returns `false` if `id` was not
    /// present. The vector's bytes stay in the file.
    pub fn delete(&self, id: &str) -> Result<bool> {
        validate_id(id)?;
        let _id_guard = self.id_lock(id).lock();

        let existed = self.index.delete_entry(id)?;
        if existed {
            debug!(id, "deleted vector");
        }
        Ok(existed)
    }

    /// Every stored vector joined with its metadata. Order is unspecified.
    pub fn scan_all(&self) -> Result<Vec<StoredVector>> {
        let entries = self.index.scan_entries()?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = self.vectors.reader()?;
        entries
            .into_iter()
            .map(|entry| {
                let vector = reader.read_at(entry.record.dim, entry.record.position)?;
                let (original_vector, metadata) = match entry.metadata {
                    Some(bytes) => {
                        let stored = decode_metadata(&bytes)?;
                        (Some(stored.original_vector), stored.fields)
                    }
                    None => (None, Metadata::new()),
                };
                Ok(StoredVector {
                    id: entry.id,
                    vector,
                    original_vector,
                    metadata,
                })
            })
            .collect()
    }

    /// Brute-force top-`k` by cosine similarity, highest score first.
    ///
    /// Stored vectors whose dimension differs from the query are skipped.
    /// Ties come back in no particular order.
    pub fn search_knn(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let norm = l2_norm(query);
        if norm == 0.0 || !norm.is_finite() {
            return Err(VectorDbError::InvalidVector {
                reason: format!("Query vector has norm {}", norm),
            });
        }

        let stored = self.scan_all()?;
        let mut results: Vec<SearchResult> = stored
            .into_par_iter()
            .filter_map(|sv| match cosine_similarity(query, &sv.vector) {
                Ok(score) => Some(SearchResult {
                    id: sv.id,
                    score,
                    vector: sv.vector,
                }),
                Err(e) => {
                    warn!(id = %sv.id, error = %e, "skipping vector during search");
                    None
                }
            })
            .collect();

        results.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    /// User metadata of one id, without the stored original vector.
    pub fn get_metadata(&self, id: &str) -> Result<Option<Metadata>> {
        validate_id(id)?;
        match self.index.find_metadata(id)? {
            Some(bytes) => Ok(Some(decode_metadata(&bytes)?.fields)),
            None => Ok(None),
        }
    }

    /// Drop every record and truncate the vector file. Returns how many
    /// records were removed.
    pub fn delete_all(&self) -> Result<usize> {
        let _id_guards: Vec<_> = self.id_locks.iter().map(|lock| lock.lock()).collect();
        let mut tail = self.tail.lock();

        let removed = self.index.count()?;
        // Index first: a record must never outlive the bytes it points at.
        self.index.clear_all()?;
        self.vectors.truncate_all()?;
        *tail = 0;

        info!(removed, "cleared all vectors");
        Ok(removed)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> Result<usize> {
        self.index.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Index record of an id, if present. Positions are internal; exposed for
    /// diagnostics and tests.
    pub fn record(&self, id: &str) -> Result<Option<VectorRecord>> {
        validate_id(id)?;
        self.index.find_index(id)
    }

    /// Current vector file length in bytes.
    pub fn vector_file_len(&self) -> Result<u64> {
        self.vectors.len()
    }
}

/// Ids share a keyspace with index records, so they may not carry the
/// index prefix.
fn validate_id(id: &str) -> Result<()> {
    if id.starts_with(INDEX_PREFIX) {
        return Err(VectorDbError::InvalidId {
            id: id.to_string(),
            reason: format!("ids may not start with {:?}", INDEX_PREFIX),
        });
    }
    Ok(())
}
