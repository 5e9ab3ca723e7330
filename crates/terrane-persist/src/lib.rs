//! Chunk persistence: a little-endian index file plus an append-only data file.

pub mod error;
pub mod format;
pub mod store;

pub use error::{FormatError, PersistError};
pub use format::{ChunkData, ChunkFileRecord, MeshLayerInfo, MeshMetadata};
pub use store::ChunkStore;
