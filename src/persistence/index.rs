//! Index + metadata store.
//!
//! Both namespaces live in one redb table. Keys starting with
//! [`INDEX_PREFIX`] hold bincode [`VectorRecord`]s; every other key is a raw
//! id holding its JSON metadata blob.

use crate::error::{Result, VectorDbError};
use crate::persistence::serialization::{decode_record, encode_record};
use crate::types::VectorRecord;
use redb::{Database, ReadableTable, Table, TableDefinition};
use std::collections::HashMap;
use std::path::Path;

/// Reserved key prefix of the index namespace.
pub const INDEX_PREFIX: &str = "_idx_";

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

type EntryTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

fn index_key(id: &str) -> String {
    format!("{}{}", INDEX_PREFIX, id)
}

/// One id's index record and raw metadata blob, read together.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub record: VectorRecord,
    pub metadata: Option<Vec<u8>>,
}

/// Persistent id -> (record, metadata) store.
pub struct IndexStore {
    db: Database,
}

impl IndexStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;

        // Create the table up front so read transactions never see it missing.
        let txn = db.begin_write()?;
        txn.open_table(ENTRIES)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Run `f` inside one write transaction and commit it.
    fn update<T>(&self, f: impl FnOnce(&mut EntryTable<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_write()?;
        let out = {
            let mut table = txn.open_table(ENTRIES)?;
            f(&mut table)?
        };
        txn.commit()?;
        Ok(out)
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    // --- index namespace ---

    pub fn put_index(&self, id: &str, record: &VectorRecord) -> Result<()> {
        let bytes = encode_record(record)?;
        self.update(|table| {
            table.insert(index_key(id).as_str(), bytes.as_slice())?;
            Ok(())
        })
    }

    /// Look up an id's record, failing with `VectorNotFound` if absent.
    pub fn get_index(&self, id: &str) -> Result<VectorRecord> {
        self.find_index(id)?
            .ok_or_else(|| VectorDbError::VectorNotFound { id: id.to_string() })
    }

    pub fn find_index(&self, id: &str) -> Result<Option<VectorRecord>> {
        self.get_raw(&index_key(id))?
            .map(|bytes| decode_record(&bytes))
            .transpose()
    }

    pub fn delete_index(&self, id: &str) -> Result<()> {
        self.update(|table| {
            table.remove(index_key(id).as_str())?;
            Ok(())
        })
    }

    /// Every index record, keyed by id. Order is unspecified.
    pub fn get_all_indices(&self) -> Result<HashMap<String, VectorRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let mut out = HashMap::new();
        for item in table.range(INDEX_PREFIX..)? {
            let (key, value) = item?;
            let Some(id) = key.value().strip_prefix(INDEX_PREFIX) else {
                break;
            };
            out.insert(id.to_string(), decode_record(value.value())?);
        }
        Ok(out)
    }

    /// Offset just past the record with the largest position, or 0 when the
    /// index is empty. `_dim` is the size of the vector about to be placed
    /// there and does not affect the result.
    ///
    /// The engine seeds its tail counter from this at open; it does not
    /// serialize concurrent allocations on its own.
    pub fn next_tail_position(&self, _dim: usize) -> Result<u64> {
        Ok(self
            .get_all_indices()?
            .values()
            .max_by_key(|r| r.position)
            .map(VectorRecord::end)
            .unwrap_or(0))
    }

    // --- metadata namespace ---

    pub fn put_metadata(&self, id: &str, bytes: &[u8]) -> Result<()> {
        self.update(|table| {
            table.insert(id, bytes)?;
            Ok(())
        })
    }

    pub fn get_metadata(&self, id: &str) -> Result<Vec<u8>> {
        self.find_metadata(id)?
            .ok_or_else(|| VectorDbError::VectorNotFound { id: id.to_string() })
    }

    pub fn find_metadata(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.get_raw(id)
    }

    pub fn delete_metadata(&self, id: &str) -> Result<()> {
        self.update(|table| {
            table.remove(id)?;
            Ok(())
        })
    }

    /// Every metadata blob, keyed by id. Order is unspecified.
    pub fn get_all_metadata(&self) -> Result<HashMap<String, Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let mut out = HashMap::new();
        for item in table.iter()? {
            let (key, value) = item?;
            let key = key.value();
            if !key.starts_with(INDEX_PREFIX) {
                out.insert(key.to_string(), value.value().to_vec());
            }
        }
        Ok(out)
    }

    // --- both namespaces ---

    /// Write an id's metadata and index record in one transaction.
    pub fn put_entry(&self, id: &str, record: &VectorRecord, metadata: &[u8]) -> Result<()> {
        let record = encode_record(record)?;
        self.update(|table| {
            table.insert(id, metadata)?;
            table.insert(index_key(id).as_str(), record.as_slice())?;
            Ok(())
        })
    }

    /// Remove an id from both namespaces. Returns whether an index record
    /// existed.
    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        self.update(|table| {
            let existed = table.remove(index_key(id).as_str())?.is_some();
            table.remove(id)?;
            Ok(existed)
        })
    }

    /// Join every index record with its metadata blob from a single read
    /// snapshot.
    pub fn scan_entries(&self) -> Result<Vec<IndexEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let mut entries = Vec::new();
        for item in table.range(INDEX_PREFIX..)? {
            let (key, value) = item?;
            let Some(id) = key.value().strip_prefix(INDEX_PREFIX) else {
                break;
            };
            entries.push(IndexEntry {
                id: id.to_string(),
                record: decode_record(value.value())?,
                metadata: None,
            });
        }

        for entry in &mut entries {
            entry.metadata = table.get(entry.id.as_str())?.map(|v| v.value().to_vec());
        }
        Ok(entries)
    }

    /// Number of index records.
    pub fn count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let mut n = 0;
        for item in table.range(INDEX_PREFIX..)? {
            let (key, _) = item?;
            if !key.value().starts_with(INDEX_PREFIX) {
                break;
            }
            n += 1;
        }
        Ok(n)
    }

    /// Remove every key from both namespaces.
    pub fn clear_all(&self) -> Result<usize> {
        self.update(|table| {
            let mut keys = Vec::new();
            for item in table.iter()? {
                let (key, _) = item?;
                keys.push(key.value().to_string());
            }
            for key in &keys {
                table.remove(key.as_str())?;
            }
            Ok(keys.len())
        })
    }
}
