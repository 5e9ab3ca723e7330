use crate::config::WorldGenConfig;
use crate::decorate::decorate;
use crate::materialize::materialize_column;
use crate::terrain::{ColumnGrid, ColumnSample, TerrainModel};
use terrane_core::constants::CHUNK_SIZE_XZ;
use terrane_core::{ChunkBuffer, ChunkCoord, ChunkFlags};

/// Reusable per-worker working memory for [`ChunkGenerator::generate_with`].
#[derive(Debug, Clone, Default)]
pub struct GenScratch {
    columns: ColumnGrid,
}

impl GenScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Deterministic chunk generator: terrain, materialization and decoration.
///
/// Holds no mutable state. Identical seed, config and coordinate always
/// produce byte-identical buffers and decoration lists.
#[derive(Debug, Clone)]
pub struct ChunkGenerator {
    terrain: TerrainModel,
}

impl ChunkGenerator {
    pub fn new(config: WorldGenConfig) -> Self {
        log::debug!("chunk generator created with seed {}", config.seed);
        Self {
            terrain: TerrainModel::new(config),
        }
    }

    pub fn config(&self) -> &WorldGenConfig {
        self.terrain.config()
    }

    pub fn terrain(&self) -> &TerrainModel {
        &self.terrain
    }

    /// Terrain sample for a world column, without generating a chunk.
    pub fn column_at(&self, x: i32, z: i32) -> ColumnSample {
        self.terrain.column(x, z)
    }

    /// World y of the top voxel of column `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.terrain.column(x, z).surface
    }

    /// Fill `buffer` with chunk `coord`: voxels, flags and decorations.
    ///
    /// Every field of the buffer is overwritten. `SOLID_SLAB` is only
    /// evaluated when `check_solid_slab` is set.
    pub fn generate(&self, coord: ChunkCoord, buffer: &mut ChunkBuffer, check_solid_slab: bool) {
        let mut scratch = GenScratch::new();
        self.generate_with(coord, buffer, &mut scratch, check_solid_slab);
    }

    /// [`ChunkGenerator::generate`] using caller-owned scratch memory.
    /// The output never depends on what the scratch held before.
    pub fn generate_with(
        &self,
        coord: ChunkCoord,
        buffer: &mut ChunkBuffer,
        scratch: &mut GenScratch,
        check_solid_slab: bool,
    ) {
        buffer.reset(coord);
        let origin = buffer.origin();
        let columns = &mut scratch.columns;
        columns.fill_chunk(&self.terrain, origin.x, origin.z);

        for lz in 0..CHUNK_SIZE_XZ {
            for lx in 0..CHUNK_SIZE_XZ {
                let wx = origin.x + lx as i32;
                let wz = origin.z + lz as i32;
                let sample = columns.local(lx as i32, lz as i32);
                materialize_column(&self.terrain, sample, wx, wz, lx, lz, origin.y, buffer);
            }
        }

        buffer.recompute_flags(false);
        decorate(&self.terrain, columns, buffer);
        let flags = buffer.recompute_flags(check_solid_slab);
        debug_assert!(!flags.contains(ChunkFlags::EDITED));
    }

    /// Convenience wrapper allocating a fresh buffer.
    pub fn generate_new(&self, coord: ChunkCoord, check_solid_slab: bool) -> ChunkBuffer {
        let mut buffer = ChunkBuffer::new();
        self.generate(coord, &mut buffer, check_solid_slab);
        buffer
    }
}
