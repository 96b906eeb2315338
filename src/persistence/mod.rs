//! Persistence layer: raw vector file, index/metadata store, and file layout.

pub mod index;
pub mod layout;
pub mod serialization;
pub mod vector_file;

pub use index::{IndexEntry, IndexStore, INDEX_PREFIX};
pub use layout::{Layout, PRIMARY_SHARD};
pub use vector_file::{VectorFile, VectorReader};
