//! Deterministic procedural chunk generation.
//!
//! [`ChunkGenerator`] turns a chunk coordinate into a filled
//! [`terrane_core::ChunkBuffer`]; [`GenerationPool`] runs it on worker threads.

pub mod config;
pub mod decorate;
pub mod error;
pub mod generator;
pub mod materialize;
pub mod noise;
pub mod pool;
pub mod terrain;

pub use config::WorldGenConfig;
pub use error::{ConfigError, PoolError};
pub use generator::{ChunkGenerator, GenScratch};
pub use noise::Noise;
pub use pool::{GenerationHandle, GenerationPool};
pub use terrain::{ColumnGrid, ColumnSample, TerrainModel};
