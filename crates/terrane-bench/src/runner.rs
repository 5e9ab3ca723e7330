use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use terrane_core::{ChunkBuffer, ChunkCoord, ChunkFlags};
use terrane_persist::{ChunkStore, PersistError};
use terrane_world::{ChunkGenerator, GenerationPool, PoolError, WorldGenConfig};

use crate::scenes::{scene_coords, SceneConfig};

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("generation failed: {0}")]
    Pool(#[from] PoolError),
    #[error("store failed: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk {0} missing after reopen")]
    Missing(ChunkCoord),
    #[error("chunk {0} read back differs from what was written")]
    Mismatch(ChunkCoord),
}

/// Timing data for a single benchmark phase across all repeats.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub chunk_count: u32,
    pub sparse_chunks: u32,
    pub decorations: u32,
    pub data_bytes: u64,
    pub repeat_count: u32,
    pub generate: TimingSeries,
    pub write: TimingSeries,
    pub read: TimingSeries,
}

impl BenchmarkResult {
    /// The three timed phases, labelled.
    pub fn phases(&self) -> [(&'static str, &TimingSeries); 3] {
        [
            ("generate", &self.generate),
            ("write", &self.write),
            ("read", &self.read),
        ]
    }
}

/// Generates scenes on a worker pool and round-trips them through a chunk store.
pub struct BenchmarkRunner {
    pool: GenerationPool,
    store_root: PathBuf,
    repeat_count: u32,
}

impl BenchmarkRunner {
    pub fn new(
        config: WorldGenConfig,
        threads: usize,
        store_root: impl Into<PathBuf>,
        repeat_count: u32,
    ) -> Result<Self, BenchError> {
        let generator = Arc::new(ChunkGenerator::new(config));
        let pool = GenerationPool::new(generator, threads)?;
        let store_root = store_root.into();
        std::fs::create_dir_all(&store_root)?;
        log::info!(
            "Benchmark pool: {} threads, stores under {}",
            pool.num_threads(),
            store_root.display()
        );
        Ok(Self {
            pool,
            store_root,
            repeat_count: repeat_count.max(1),
        })
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, config: &SceneConfig) -> Result<BenchmarkResult, BenchError> {
        let coords = scene_coords(config);
        log::info!(
            "Running scene '{}' ({} chunks, {} repeats)...",
            config.name,
            coords.len(),
            self.repeat_count
        );

        let mut generate_times = Vec::with_capacity(self.repeat_count as usize);
        let mut write_times = Vec::with_capacity(self.repeat_count as usize);
        let mut read_times = Vec::with_capacity(self.repeat_count as usize);
        let mut sparse_chunks = 0;
        let mut decorations = 0;
        let mut data_bytes = 0;

        for repeat in 0..self.repeat_count {
            let start = Instant::now();
            let buffers = self.pool.generate_batch(&coords, config.check_solid_slab)?;
            generate_times.push(elapsed_ms(start));

            sparse_chunks = buffers
                .iter()
                .filter(|b| !b.flags().has_content())
                .count() as u32;
            decorations = buffers
                .iter()
                .map(|b| b.decorations().len() as u32)
                .sum();

            let path = self
                .store_root
                .join(format!("r{}-{}", config.radius, repeat));

            let start = Instant::now();
            let store = ChunkStore::open_or_create(&path)?;
            let index_path = store.index_path().to_path_buf();
            let data_path = store.data_path().to_path_buf();
            for buffer in &buffers {
                store.write_buffer(buffer)?;
            }
            data_bytes = store.data_len()?;
            store.close()?;
            write_times.push(elapsed_ms(start));

            let start = Instant::now();
            let store = ChunkStore::open_or_create(&path)?;
            let mut scratch = ChunkBuffer::new();
            for buffer in &buffers {
                if !store.try_read_into(buffer.coord(), &mut scratch)? {
                    return Err(BenchError::Missing(buffer.coord()));
                }
                verify(buffer, &scratch)?;
            }
            store.close()?;
            read_times.push(elapsed_ms(start));

            remove_if_present(&index_path);
            remove_if_present(&data_path);
        }

        let result = BenchmarkResult {
            scene_name: config.name.clone(),
            chunk_count: coords.len() as u32,
            sparse_chunks,
            decorations,
            data_bytes,
            repeat_count: self.repeat_count,
            generate: compute_timings(&generate_times),
            write: compute_timings(&write_times),
            read: compute_timings(&read_times),
        };
        log::info!(
            "  Done: generate={:.2}ms, write={:.2}ms, read={:.2}ms ({} sparse, {} KiB)",
            result.generate.mean_ms,
            result.write.mean_ms,
            result.read.mean_ms,
            result.sparse_chunks,
            result.data_bytes / 1024
        );
        Ok(result)
    }
}

/// Stored chunks must read back voxel for voxel. Sparse chunks only keep their flags.
/// Loaded chunks never carry decorations.
fn verify(written: &ChunkBuffer, read: &ChunkBuffer) -> Result<(), BenchError> {
    let coord = written.coord();
    let mut expected = written.flags();
    expected.remove(ChunkFlags::DECORATIONS);
    if read.coord() != coord || read.flags() != expected {
        return Err(BenchError::Mismatch(coord));
    }
    if written.flags().has_content() && read.voxels() != written.voxels() {
        return Err(BenchError::Mismatch(coord));
    }
    Ok(())
}

fn remove_if_present(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove {}: {e}", path.display());
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
