use std::path::PathBuf;
use terrane_core::ChunkCoord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read world generation config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse world generation RON: {0}")]
    Parse(String),
    #[error("Invalid world generation config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to build generation thread pool: {0}")]
    Build(String),
    #[error("Generation worker for chunk {0} exited without returning its buffer")]
    WorkerLost(ChunkCoord),
}
