use crate::error::PoolError;
use crate::generator::{ChunkGenerator, GenScratch};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use terrane_core::{ChunkBuffer, ChunkCoord};

/// Worker pool running one generation task per chunk.
pub struct GenerationPool {
    pool: ThreadPool,
    generator: Arc<ChunkGenerator>,
    scratch: Arc<ScratchPool>,
}

/// Idle generation scratch shared by the workers, at most one per thread.
struct ScratchPool {
    tx: Sender<GenScratch>,
    rx: Receiver<GenScratch>,
}

impl ScratchPool {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx }
    }

    fn acquire(&self) -> GenScratch {
        self.rx.try_recv().unwrap_or_default()
    }

    /// Return scratch for reuse; dropped when the pool is already full.
    fn release(&self, scratch: GenScratch) {
        let _ = self.tx.try_send(scratch);
    }

    fn idle(&self) -> usize {
        self.rx.len()
    }
}

/// Pending result of [`GenerationPool::schedule_generate`].
///
/// Carries the caller's buffer back once the worker is done with it.
pub struct GenerationHandle {
    coord: ChunkCoord,
    rx: Receiver<ChunkBuffer>,
}

impl GenerationPool {
    /// `threads == 0` lets rayon pick one thread per core.
    pub fn new(generator: Arc<ChunkGenerator>, threads: usize) -> Result<Self, PoolError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terrane-gen-{i}"))
            // A panicking job drops its sender, which the handle reports as WorkerLost.
            .panic_handler(|_| log::error!("chunk generation job panicked"))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;
        log::debug!(
            "generation pool started with {} threads",
            pool.current_num_threads()
        );
        let scratch = Arc::new(ScratchPool::new(pool.current_num_threads()));
        Ok(Self {
            pool,
            generator,
            scratch,
        })
    }

    pub fn generator(&self) -> &Arc<ChunkGenerator> {
        &self.generator
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue generation of `coord` into `buffer`. The buffer comes back through the handle.
    pub fn schedule_generate(
        &self,
        coord: ChunkCoord,
        mut buffer: ChunkBuffer,
        check_solid_slab: bool,
    ) -> GenerationHandle {
        let (tx, rx) = bounded(1);
        let generator = Arc::clone(&self.generator);
        let scratch_pool = Arc::clone(&self.scratch);
        self.pool.spawn(move || {
            let mut scratch = scratch_pool.acquire();
            generator.generate_with(coord, &mut buffer, &mut scratch, check_solid_slab);
            scratch_pool.release(scratch);
            // The caller may have dropped the handle; the buffer is discarded then.
            let _ = tx.send(buffer);
        });
        GenerationHandle { coord, rx }
    }

    /// Generate every coordinate in parallel and return the buffers in input order.
    pub fn generate_batch(
        &self,
        coords: &[ChunkCoord],
        check_solid_slab: bool,
    ) -> Result<Vec<ChunkBuffer>, PoolError> {
        let handles: Vec<GenerationHandle> = coords
            .iter()
            .map(|&coord| self.schedule_generate(coord, ChunkBuffer::new(), check_solid_slab))
            .collect();
        handles.into_iter().map(GenerationHandle::wait).collect()
    }
}

impl GenerationHandle {
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Non-blocking poll. `Ok(None)` while the job is still running.
    pub fn try_take(&self) -> Result<Option<ChunkBuffer>, PoolError> {
        match self.rx.try_recv() {
            Ok(buffer) => Ok(Some(buffer)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PoolError::WorkerLost(self.coord)),
        }
    }

    /// Block until the chunk is generated.
    pub fn wait(self) -> Result<ChunkBuffer, PoolError> {
        self.rx.recv().map_err(|_| PoolError::WorkerLost(self.coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldGenConfig;
    use glam::IVec3;

    #[test]
    fn test_pool_matches_direct_generation() {
        let generator = Arc::new(ChunkGenerator::new(WorldGenConfig::default()));
        let pool = GenerationPool::new(Arc::clone(&generator), 2).expect("pool");
        assert_eq!(pool.num_threads(), 2);

        let coord = IVec3::new(-2, 0, 3);
        let handle = pool.schedule_generate(coord, ChunkBuffer::new(), true);
        assert_eq!(handle.coord(), coord);
        let pooled = handle.wait().expect("generated");
        assert_eq!(pooled, generator.generate_new(coord, true));
    }

    #[test]
    fn test_generate_batch_preserves_order() {
        let generator = Arc::new(ChunkGenerator::new(WorldGenConfig::default()));
        let pool = GenerationPool::new(generator, 4).expect("pool");
        let coords: Vec<_> = (-3..3).map(|i| IVec3::new(i, 0, -i)).collect();
        let buffers = pool.generate_batch(&coords, false).expect("batch");
        assert_eq!(buffers.len(), coords.len());
        for (buffer, coord) in buffers.iter().zip(&coords) {
            assert_eq!(buffer.coord(), *coord);
        }
    }

    #[test]
    fn test_scratch_recycled_up_to_thread_count() {
        let generator = Arc::new(ChunkGenerator::new(WorldGenConfig::default()));
        let pool = GenerationPool::new(Arc::clone(&generator), 2).expect("pool");
        let coords: Vec<_> = (0..8).map(|i| IVec3::new(i, 0, 1 - i)).collect();
        let buffers = pool.generate_batch(&coords, false).expect("batch");
        let idle = pool.scratch.idle();
        assert!((1..=2).contains(&idle), "idle scratch {idle}");
        for (buffer, coord) in buffers.iter().zip(&coords) {
            assert_eq!(*buffer, generator.generate_new(*coord, false));
        }
    }

    #[test]
    fn test_try_take_eventually_returns_buffer() {
        let generator = Arc::new(ChunkGenerator::new(WorldGenConfig::default()));
        let pool = GenerationPool::new(generator, 1).expect("pool");
        let handle = pool.schedule_generate(IVec3::new(0, 5, 0), ChunkBuffer::new(), false);
        let buffer = loop {
            if let Some(buffer) = handle.try_take().expect("worker alive") {
                break buffer;
            }
            std::thread::yield_now();
        };
        assert_eq!(buffer.coord(), IVec3::new(0, 5, 0));
    }
}
