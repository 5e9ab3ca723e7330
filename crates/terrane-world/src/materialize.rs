use crate::config::WorldGenConfig;
use crate::terrain::{is_frozen, ColumnSample, TerrainModel};
use terrane_core::constants::CHUNK_SIZE_Y;
use terrane_core::{BlockType, ChunkBuffer, Voxel};

const SALT_FULL_VOXEL: u32 = 0x5EED_0001;

/// Inputs of the surface block decision for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInputs {
    /// World y of the surface voxel.
    pub elevation: i32,
    pub water_level: i32,
    pub sand_band: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rockiness: f64,
    /// Grass noise term in [-1, 1].
    pub grass_noise: f64,
    pub road: bool,
    pub river_bed: bool,
}

/// Block type of the top solid voxel of a column.
pub fn select_surface_block(inputs: &SurfaceInputs, dry_humidity: f64) -> BlockType {
    if inputs.river_bed {
        return BlockType::Sand;
    }
    if (inputs.elevation as f64) <= inputs.water_level as f64 + inputs.sand_band {
        return BlockType::Sand;
    }
    if is_frozen(inputs.temperature, inputs.humidity) {
        return BlockType::Snow;
    }
    if inputs.road {
        return BlockType::Dirt;
    }
    if inputs.humidity < dry_humidity {
        return BlockType::Sand;
    }
    let grass = inputs.humidity * (1.0 - inputs.rockiness) + 0.2 * inputs.grass_noise;
    if grass >= 0.1 {
        BlockType::Grass
    } else if inputs.rockiness > 0.6 {
        BlockType::Rock
    } else {
        BlockType::Dirt
    }
}

/// Block at a column's ground voxel.
pub fn surface_block(config: &WorldGenConfig, sample: &ColumnSample) -> BlockType {
    let inputs = SurfaceInputs {
        elevation: sample.ground(),
        water_level: config.water_level,
        sand_band: sample.sand_band,
        temperature: sample.temperature,
        humidity: sample.humidity,
        rockiness: sample.rockiness,
        grass_noise: sample.grass_noise,
        road: sample.road,
        river_bed: sample.river,
    };
    select_surface_block(&inputs, config.surface.dry_humidity)
}

/// Fill column `(local_x, local_z)` of `buffer` from `sample`.
///
/// `world_x`/`world_z` are the column's world coordinates and `chunk_y0` the
/// world y of the buffer's lowest layer.
#[allow(clippy::too_many_arguments)]
pub fn materialize_column(
    terrain: &TerrainModel,
    sample: &ColumnSample,
    world_x: i32,
    world_z: i32,
    local_x: u32,
    local_z: u32,
    chunk_y0: i32,
    buffer: &mut ChunkBuffer,
) {
    let config = terrain.config();
    let water_level = config.water_level;
    let ground = sample.ground();
    let frozen = sample.frozen();
    let surface_block = surface_block(config, sample);

    for ly in 0..CHUNK_SIZE_Y {
        let y = chunk_y0 + ly as i32;
        let block = if y > sample.surface {
            if y <= water_level {
                if frozen && y == water_level {
                    BlockType::Ice
                } else {
                    BlockType::Water
                }
            } else {
                BlockType::Air
            }
        } else if y > ground {
            // River water carved below the surface.
            if frozen && y == sample.surface {
                BlockType::Ice
            } else {
                BlockType::Water
            }
        } else if y == ground {
            surface_block
        } else {
            let depth = ground - y;
            if terrain.is_cave(world_x, y, world_z, depth) {
                BlockType::Air
            } else if sample.rockiness + depth as f64 * config.surface.rockiness_depth_gain > 0.5 {
                BlockType::Rock
            } else {
                BlockType::Dirt
            }
        };

        let full = block == BlockType::Rock
            && terrain
                .noise()
                .white_noise_salted(world_x, y, world_z, SALT_FULL_VOXEL)
                > config.surface.full_voxel_gate;
        buffer.set(local_x, ly, local_z, Voxel::new(block, full));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use terrane_core::ChunkFlags;

    fn grassland() -> SurfaceInputs {
        SurfaceInputs {
            elevation: 40,
            water_level: 24,
            sand_band: 2.0,
            temperature: 65.0,
            humidity: 0.6,
            rockiness: 0.2,
            grass_noise: 0.0,
            road: false,
            river_bed: false,
        }
    }

    fn sample(surface: i32, water_depth: i32, temperature: f64) -> ColumnSample {
        ColumnSample {
            base: surface as f64,
            surface,
            water_depth,
            humidity: 0.6,
            temperature,
            rockiness: 0.2,
            sand_band: 2.0,
            grass_noise: 0.0,
            river: water_depth > 0,
            road: false,
        }
    }

    #[test]
    fn test_temperate_grassland_is_grass() {
        assert_eq!(select_surface_block(&grassland(), 0.2), BlockType::Grass);
    }

    #[test]
    fn test_surface_rules_in_order() {
        let base = grassland();
        let near_water = SurfaceInputs { elevation: 26, ..base };
        assert_eq!(select_surface_block(&near_water, 0.2), BlockType::Sand);
        let frozen = SurfaceInputs { temperature: 10.0, ..base };
        assert_eq!(select_surface_block(&frozen, 0.2), BlockType::Snow);
        let road = SurfaceInputs { road: true, ..base };
        assert_eq!(select_surface_block(&road, 0.2), BlockType::Dirt);
        let dry = SurfaceInputs { humidity: 0.1, ..base };
        assert_eq!(select_surface_block(&dry, 0.2), BlockType::Sand);
        let bed = SurfaceInputs { river_bed: true, ..base };
        assert_eq!(select_surface_block(&bed, 0.2), BlockType::Sand);
        let rocky = SurfaceInputs { humidity: 0.3, rockiness: 0.9, grass_noise: -0.5, ..base };
        assert_eq!(select_surface_block(&rocky, 0.2), BlockType::Rock);
        let bare = SurfaceInputs { humidity: 0.3, rockiness: 0.5, grass_noise: -0.5, ..base };
        assert_eq!(select_surface_block(&bare, 0.2), BlockType::Dirt);
    }

    #[test]
    fn test_underwater_column() {
        let terrain = TerrainModel::new(WorldGenConfig::default());
        let mut buffer = ChunkBuffer::new();
        let s = sample(10, 0, 65.0);
        materialize_column(&terrain, &s, 0, 0, 0, 0, 0, &mut buffer);

        assert_eq!(buffer.get(0, 10, 0).block(), BlockType::Sand);
        for y in 11..=24 {
            assert_eq!(buffer.get(0, y, 0).block(), BlockType::Water, "y={y}");
        }
        for y in 25..CHUNK_SIZE_Y {
            assert_eq!(buffer.get(0, y, 0).block(), BlockType::Air, "y={y}");
        }
        // Within min_depth of the ground nothing is carved.
        for y in 7..10 {
            assert!(buffer.get(0, y, 0).block().is_solid(), "y={y}");
        }
    }

    #[test]
    fn test_frozen_water_has_ice_on_top() {
        let terrain = TerrainModel::new(WorldGenConfig::default());
        let mut buffer = ChunkBuffer::new();
        let s = sample(10, 0, 5.0);
        materialize_column(&terrain, &s, 0, 0, 3, 3, 0, &mut buffer);
        assert_eq!(buffer.get(3, 24, 3).block(), BlockType::Ice);
        assert_eq!(buffer.get(3, 23, 3).block(), BlockType::Water);
        assert_eq!(buffer.get(3, 25, 3).block(), BlockType::Air);
    }

    #[test]
    fn test_river_column() {
        let terrain = TerrainModel::new(WorldGenConfig::default());
        let mut buffer = ChunkBuffer::new();
        buffer.reset(IVec3::new(0, 1, 0));
        let s = sample(40, 3, 65.0);
        materialize_column(&terrain, &s, 0, 0, 0, 0, 32, &mut buffer);
        // World y 38..=40 is water, 37 the sand bed, 41 air.
        for y in 38..=40 {
            assert_eq!(buffer.get(0, (y - 32) as u32, 0).block(), BlockType::Water);
        }
        assert_eq!(buffer.get(0, 37 - 32, 0).block(), BlockType::Sand);
        assert_eq!(buffer.get(0, 41 - 32, 0).block(), BlockType::Air);
        assert!(buffer.recompute_flags(false).contains(ChunkFlags::LIQUID));
    }
}
