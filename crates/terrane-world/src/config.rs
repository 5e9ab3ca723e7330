//! World generation parameters, loadable from RON.
//!
//! Every section carries `#[serde(default)]`, so a file only needs the
//! fields it overrides.

use crate::error::ConfigError;
use crate::noise::Octave;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    pub seed: u64,
    /// World y of the top water voxel in oceans and lakes.
    pub water_level: i32,
    pub elevation: Elevation,
    pub ramps: Ramps,
    pub rivers: Rivers,
    pub roads: Roads,
    pub caves: Caves,
    pub climate: Climate,
    pub surface: Surface,
    pub vegetation: Vegetation,
    pub structures: Structures,
    pub spawners: Spawners,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            water_level: 24,
            elevation: Elevation::default(),
            ramps: Ramps::default(),
            rivers: Rivers::default(),
            roads: Roads::default(),
            caves: Caves::default(),
            climate: Climate::default(),
            surface: Surface::default(),
            vegetation: Vegetation::default(),
            structures: Structures::default(),
            spawners: Spawners::default(),
        }
    }
}

impl WorldGenConfig {
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let options = ron::Options::default();
        let config: WorldGenConfig = options
            .from_str(ron_str)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Same parameters with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elevation.plateau_step <= 0 {
            return Err(ConfigError::Invalid(format!(
                "elevation.plateau_step must be positive, got {}",
                self.elevation.plateau_step
            )));
        }
        if self.ramps.radius <= 0 {
            return Err(ConfigError::Invalid(format!(
                "ramps.radius must be positive, got {}",
                self.ramps.radius
            )));
        }
        let cells = [
            ("structures.cell", self.structures.cell),
            ("spawners.monster_cell", self.spawners.monster_cell),
            ("spawners.merchant_cell", self.spawners.merchant_cell),
            ("spawners.horse_cell", self.spawners.horse_cell),
            ("spawners.chest_cell", self.spawners.chest_cell),
            ("spawners.map_reveal_cell", self.spawners.map_reveal_cell),
        ];
        for (name, cell) in cells {
            if cell <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {cell}"
                )));
            }
        }
        if self.structures.cell < 2 * self.structures.margin {
            return Err(ConfigError::Invalid(format!(
                "structures.cell ({}) must be at least twice structures.margin ({})",
                self.structures.cell, self.structures.margin
            )));
        }
        Ok(())
    }
}

/// Plateau term: `amplitude * gate * ((n + 1) / 2)^power`, only where the gate noise is positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateauTerm {
    pub frequency: f64,
    pub gate_frequency: f64,
    pub amplitude: f64,
    pub power: f64,
}

/// Logistic hill bump: `amplitude / (1 + e^(-steepness * (n - center)))`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HillTerm {
    pub frequency: f64,
    pub amplitude: f64,
    pub steepness: f64,
    pub center: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Elevation {
    pub base_offset: f64,
    pub amplitude: f64,
    /// Lowest frequency first; it carries the largest weight.
    pub octaves: Vec<Octave>,
    pub plateau_step: i32,
    pub plateaus: Vec<PlateauTerm>,
    pub hills: Vec<HillTerm>,
    pub erosion_frequencies: [f64; 2],
    pub erosion_amplitude: f64,
}

impl Default for Elevation {
    fn default() -> Self {
        Self {
            base_offset: 5.0,
            amplitude: 22.0,
            octaves: vec![
                Octave::new(0.0035, 0.55),
                Octave::new(0.009, 0.25),
                Octave::new(0.021, 0.13),
                Octave::new(0.05, 0.07),
            ],
            plateau_step: 6,
            plateaus: vec![PlateauTerm {
                frequency: 0.006,
                gate_frequency: 0.002,
                amplitude: 14.0,
                power: 3.0,
            }],
            hills: vec![HillTerm {
                frequency: 0.015,
                amplitude: 5.0,
                steepness: 9.0,
                center: 0.45,
            }],
            erosion_frequencies: [0.0012, 0.0045],
            erosion_amplitude: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ramps {
    /// Distance from a step boundary (in voxels of base elevation) inside which ramps may form.
    pub band: f64,
    pub threshold: f64,
    pub frequency: f64,
    /// Spacing of the 3x3 averaging samples.
    pub radius: i32,
}

impl Default for Ramps {
    fn default() -> Self {
        Self {
            band: 1.5,
            threshold: 0.18,
            frequency: 0.04,
            radius: 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rivers {
    pub frequency: f64,
    pub width: f64,
    pub humidity_width: f64,
    pub noise_width: f64,
    pub width_frequency: f64,
    /// Maximum pull of the stepped elevation toward the unstepped base.
    pub pull: f64,
    pub depth: f64,
}

impl Default for Rivers {
    fn default() -> Self {
        Self {
            frequency: 0.0022,
            width: 0.025,
            humidity_width: 0.03,
            noise_width: 0.012,
            width_frequency: 0.01,
            pull: 1.0,
            depth: 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roads {
    pub frequency: f64,
    pub width: f64,
    pub pull: f64,
}

impl Default for Roads {
    fn default() -> Self {
        Self {
            frequency: 0.003,
            width: 0.012,
            pull: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caves {
    /// Voxels closer than this to the ground surface are never carved.
    pub min_depth: i32,
    pub octaves: Vec<Octave>,
    /// Depth at which the cave field reaches full strength.
    pub depth_scale: f64,
    pub threshold: f64,
    pub threshold_noise: f64,
    pub threshold_frequency: f64,
    /// Threshold decrease per voxel of depth.
    pub threshold_falloff: f64,
    pub min_threshold: f64,
}

impl Default for Caves {
    fn default() -> Self {
        Self {
            min_depth: 3,
            octaves: vec![
                Octave::new(0.03, 0.6),
                Octave::new(0.065, 0.3),
                Octave::new(0.13, 0.1),
            ],
            depth_scale: 16.0,
            threshold: 0.5,
            threshold_noise: 0.1,
            threshold_frequency: 0.008,
            threshold_falloff: 0.004,
            min_threshold: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Climate {
    pub humidity_octaves: Vec<Octave>,
    pub temperature_octaves: Vec<Octave>,
    pub temperature_mean: f64,
    pub temperature_range: f64,
    /// Degrees lost per voxel above water level.
    pub temperature_lapse: f64,
}

impl Default for Climate {
    fn default() -> Self {
        Self {
            humidity_octaves: vec![Octave::new(0.0018, 0.75), Octave::new(0.008, 0.25)],
            temperature_octaves: vec![Octave::new(0.0011, 0.8), Octave::new(0.006, 0.2)],
            temperature_mean: 60.0,
            temperature_range: 40.0,
            temperature_lapse: 0.6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub sand_band: f64,
    pub sand_band_noise: f64,
    pub dry_humidity: f64,
    pub grass_frequency: f64,
    pub rockiness_frequency: f64,
    /// Rockiness added per voxel above water level.
    pub rockiness_height_gain: f64,
    /// Rockiness added per voxel of depth below the surface.
    pub rockiness_depth_gain: f64,
    /// Rock voxels whose white noise exceeds this get the full-voxel hint.
    pub full_voxel_gate: f64,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            sand_band: 1.0,
            sand_band_noise: 2.0,
            dry_humidity: 0.2,
            grass_frequency: 0.08,
            rockiness_frequency: 0.012,
            rockiness_height_gain: 0.008,
            rockiness_depth_gain: 0.15,
            full_voxel_gate: 0.6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vegetation {
    pub outcrop_chance: f64,
    pub tree_chance: f64,
    pub flower_chance: f64,
    pub flower_frequency: f64,
}

impl Default for Vegetation {
    fn default() -> Self {
        Self {
            outcrop_chance: 0.004,
            tree_chance: 0.03,
            flower_chance: 0.04,
            flower_frequency: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Structures {
    pub enabled: bool,
    /// Side length of the square cells structures are quantized to.
    pub cell: i32,
    /// Anchors keep this distance from cell borders.
    pub margin: i32,
    pub chance: f64,
}

impl Default for Structures {
    fn default() -> Self {
        Self {
            enabled: true,
            cell: 256,
            margin: 24,
            chance: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spawners {
    pub monster_cell: i32,
    pub monster_chance: f64,
    pub merchant_cell: i32,
    pub merchant_chance: f64,
    pub horse_cell: i32,
    pub horse_chance: f64,
    pub chest_cell: i32,
    pub chest_chance: f64,
    pub map_reveal_cell: i32,
    pub map_reveal_chance: f64,
}

impl Default for Spawners {
    fn default() -> Self {
        Self {
            monster_cell: 40,
            monster_chance: 0.5,
            merchant_cell: 160,
            merchant_chance: 0.3,
            horse_cell: 96,
            horse_chance: 0.35,
            chest_cell: 64,
            chest_chance: 0.3,
            map_reveal_cell: 192,
            map_reveal_chance: 0.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let ron = r#"(
            seed: 7,
            water_level: 30,
            rivers: (depth: 2.0),
        )"#;
        let config = WorldGenConfig::from_ron_str(ron).expect("should parse");
        assert_eq!(config.seed, 7);
        assert_eq!(config.water_level, 30);
        assert_eq!(config.rivers.depth, 2.0);
        assert_eq!(config.rivers.pull, Rivers::default().pull);
        assert_eq!(config.elevation, Elevation::default());
    }

    #[test]
    fn test_empty_ron_is_default() {
        let config = WorldGenConfig::from_ron_str("()").expect("should parse");
        assert_eq!(config, WorldGenConfig::default());
    }

    #[test]
    fn test_malformed_ron_rejected() {
        let result = WorldGenConfig::from_ron_str("(seed: [this is not valid");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = WorldGenConfig::from_ron_str("(elevation: (plateau_step: 0))");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let result = WorldGenConfig::from_ron_str("(structures: (cell: 20, margin: 24))");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = WorldGenConfig::from_path("/nonexistent/terrane/worldgen.ron");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_shipped_default_matches_code() {
        let shipped = include_str!("../../../data/worldgen/default.ron");
        let config = WorldGenConfig::from_ron_str(shipped).expect("shipped config parses");
        assert_eq!(config, WorldGenConfig::default());
    }
}
