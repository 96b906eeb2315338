//! # flatvec
//!
//! A minimal disk-backed vector database.
//!
//! This library provides:
//! - A headerless little-endian f32 vector file, addressed by byte offset
//! - An id -> (offset, dimension) index and metadata store on redb
//! - An engine that normalizes on write and runs brute-force cosine k-NN
//! - An HTTP API over the engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatvec::{Engine, EngineConfig, Metadata};
//!
//! let engine = Engine::open("./data", EngineConfig::default())?;
//!
//! // Insert vectors
//! engine.upsert("v1", &[1.0, 0.0, 0.0], Metadata::new())?;
//! engine.upsert("v2", &[0.0, 1.0, 0.0], Metadata::new())?;
//!
//! // Search for similar vectors
//! let results = engine.search_knn(&[0.9, 0.1, 0.0], 1)?;
//! assert_eq!(results[0].id, "v1");
//! # Ok::<(), flatvec::VectorDbError>(())
//! ```

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod server;
pub mod types;

pub use config::Config;
pub use engine::{Engine, EngineConfig};
pub use error::{ErrorKind, Result, VectorDbError};
pub use types::{Metadata, SearchResult, StoredVector, VectorRecord};
