//! Raw vector file.
//!
//! The file is a flat run of little-endian f32 values with no header and no
//! record boundaries. Every vector is addressed by a byte offset and a
//! dimension that the index store keeps; this module never interprets them.

use crate::error::{IoContext, Result, VectorDbError};
use crate::types::F32_BYTES;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Handle to one shard's vector file. Cheap to share; every call opens the
/// file itself.
#[derive(Debug, Clone)]
pub struct VectorFile {
    path: PathBuf,
    sync_writes: bool,
}

impl VectorFile {
    pub fn new(path: impl AsRef<Path>, sync_writes: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync_writes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length in bytes; 0 if the file does not exist yet.
    pub fn len(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(VectorDbError::Io {
                op: "stat vector file",
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append a vector at end-of-file and return the offset it was written at.
    ///
    /// Callers must serialize appends; the returned offset is only meaningful
    /// if nobody else grows the file between the length check and the write.
    pub fn append(&self, vector: &[f32]) -> Result<u64> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .io_context("open vector file", &self.path)?;

        let position = file
            .seek(SeekFrom::End(0))
            .io_context("seek to end of vector file", &self.path)?;

        file.write_all(&encode(vector))
            .io_context("append to vector file", &self.path)?;
        self.finish(&file)?;

        Ok(position)
    }

    /// Overwrite `vector.len()` floats at `position`.
    ///
    /// The caller guarantees the range belongs to an existing record of the
    /// same dimension.
    pub fn write_at(&self, vector: &[f32], position: u64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)
            .io_context("open vector file", &self.path)?;

        file.seek(SeekFrom::Start(position))
            .io_context("seek in vector file", &self.path)?;
        file.write_all(&encode(vector))
            .io_context("write to vector file", &self.path)?;
        self.finish(&file)
    }

    /// Read exactly `dim` floats starting at `position`.
    pub fn read_at(&self, dim: usize, position: u64) -> Result<Vec<f32>> {
        self.reader()?.read_at(dim, position)
    }

    /// Open the file once for a batch of positional reads.
    pub fn reader(&self) -> Result<VectorReader> {
        let file = File::open(&self.path).io_context("open vector file", &self.path)?;
        Ok(VectorReader {
            path: self.path.clone(),
            file,
        })
    }

    /// Read the whole file as consecutive vectors of `dim` floats.
    pub fn load_all(&self, dim: usize) -> Result<Vec<Vec<f32>>> {
        if dim == 0 {
            return Err(VectorDbError::InvalidVector {
                reason: "Dimension must be positive".to_string(),
            });
        }

        let len = self.len()?;
        if len == 0 {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).io_context("open vector file", &self.path)?;
        // SAFETY: the mapping is read-only and dropped before returning.
        // Falls back to a plain read if the platform refuses the mapping.
        match unsafe { memmap2::Mmap::map(&file) } {
            Ok(mmap) => self.decode_aligned(&mmap, dim),
            Err(_) => {
                let bytes = fs::read(&self.path).io_context("read vector file", &self.path)?;
                self.decode_aligned(&bytes, dim)
            }
        }
    }

    /// Split `bytes` into vectors of `dim` floats. The length is checked on
    /// the bytes actually read, not on an earlier stat.
    fn decode_aligned(&self, bytes: &[u8], dim: usize) -> Result<Vec<Vec<f32>>> {
        let stride = dim * F32_BYTES as usize;
        if bytes.len() % stride != 0 {
            return Err(VectorDbError::Misaligned {
                path: self.path.clone(),
                len: bytes.len() as u64,
                dim,
            });
        }
        Ok(decode_all(bytes, dim))
    }

    /// Grow the file with zero bytes to at least `len`. Never shrinks it.
    pub fn extend_to(&self, len: u64) -> Result<()> {
        if self.len()? >= len {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .io_context("open vector file", &self.path)?;
        file.set_len(len)
            .io_context("extend vector file", &self.path)?;
        self.finish(&file)
    }

    /// Reset the file to zero length. A missing file is left missing.
    ///
    /// The index store must be cleared alongside, or its records will point
    /// at bytes that no longer exist.
    pub fn truncate_all(&self) -> Result<()> {
        let file = match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(VectorDbError::Io {
                    op: "open vector file",
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        file.set_len(0)
            .io_context("truncate vector file", &self.path)?;
        self.finish(&file)
    }

    fn finish(&self, file: &File) -> Result<()> {
        if self.sync_writes {
            file.sync_data().io_context("sync vector file", &self.path)?;
        }
        Ok(())
    }
}

/// An open vector file used for many positional reads in a row.
#[derive(Debug)]
pub struct VectorReader {
    path: PathBuf,
    file: File,
}

impl VectorReader {
    pub fn read_at(&mut self, dim: usize, position: u64) -> Result<Vec<f32>> {
        let expected = dim * F32_BYTES as usize;

        self.file
            .seek(SeekFrom::Start(position))
            .io_context("seek in vector file", &self.path)?;

        let mut buf = Vec::with_capacity(expected);
        (&mut self.file)
            .take(expected as u64)
            .read_to_end(&mut buf)
            .io_context("read vector file", &self.path)?;

        if buf.len() < expected {
            return Err(VectorDbError::ShortRead {
                path: self.path.clone(),
                position,
                expected,
                actual: buf.len(),
            });
        }

        Ok(decode(&buf))
    }
}

fn encode(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * F32_BYTES as usize);
    for &val in vector {
        buf.extend_from_slice(&val.to_le_bytes());
    }
    buf
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES as usize)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn decode_all(bytes: &[u8], dim: usize) -> Vec<Vec<f32>> {
    bytes
        .chunks_exact(dim * F32_BYTES as usize)
        .map(decode)
        .collect()
}
