use glam::IVec3;
use terrane_core::ChunkCoord;

/// Configuration for a single benchmark scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub name: String,
    /// Horizontal radius in chunks around the origin column.
    pub radius: i32,
    pub min_chunk_y: i32,
    pub max_chunk_y: i32,
    pub check_solid_slab: bool,
}

/// Vertical chunk range that covers the default terrain from below the
/// sea floor to above the tallest plateaus.
pub const DEFAULT_CHUNK_Y: (i32, i32) = (-1, 2);

/// Return the standard suite of benchmark scenes (radius 1 to 6).
pub fn standard_scenes() -> Vec<SceneConfig> {
    [1, 2, 4, 6]
        .into_iter()
        .map(|radius| scene_for_radius(radius, true))
        .collect()
}

pub fn scene_for_radius(radius: i32, check_solid_slab: bool) -> SceneConfig {
    let side = 2 * radius + 1;
    SceneConfig {
        name: format!("r{radius} ({side}x{side})"),
        radius,
        min_chunk_y: DEFAULT_CHUNK_Y.0,
        max_chunk_y: DEFAULT_CHUNK_Y.1,
        check_solid_slab,
    }
}

/// Every chunk coordinate of the scene, ordered x, z, then y.
pub fn scene_coords(config: &SceneConfig) -> Vec<ChunkCoord> {
    let r = config.radius.max(0);
    let mut coords = Vec::with_capacity(scene_chunk_count(config) as usize);
    for x in -r..=r {
        for z in -r..=r {
            for y in config.min_chunk_y..=config.max_chunk_y {
                coords.push(IVec3::new(x, y, z));
            }
        }
    }
    coords
}

pub fn scene_chunk_count(config: &SceneConfig) -> u32 {
    let side = (2 * config.radius.max(0) + 1) as u32;
    let layers = (config.max_chunk_y - config.min_chunk_y + 1).max(0) as u32;
    side * side * layers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_coords_match_count() {
        for config in standard_scenes() {
            let coords = scene_coords(&config);
            assert_eq!(coords.len() as u32, scene_chunk_count(&config));
        }
    }

    #[test]
    fn test_scene_coords_unique_and_centered() {
        let config = scene_for_radius(2, false);
        let coords = scene_coords(&config);
        let unique: std::collections::HashSet<_> = coords.iter().copied().collect();
        assert_eq!(unique.len(), coords.len());
        assert!(coords.contains(&IVec3::new(0, 0, 0)));
        assert!(coords.contains(&IVec3::new(-2, DEFAULT_CHUNK_Y.0, 2)));
        assert!(!coords.contains(&IVec3::new(3, 0, 0)));
    }

    #[test]
    fn test_zero_radius_is_single_column() {
        let config = scene_for_radius(0, false);
        assert_eq!(scene_chunk_count(&config), 4);
    }
}
