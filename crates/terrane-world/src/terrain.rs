use crate::config::WorldGenConfig;
use crate::noise::Noise;
use terrane_core::constants::CHUNK_SIZE_XZ;

// Noise-space planes keeping each 2D field independent.
const PLANE_BASE: f64 = 0.0;
const PLANE_PLATEAU: f64 = 101.0;
const PLANE_PLATEAU_GATE: f64 = 211.0;
const PLANE_HILL: f64 = 307.0;
const PLANE_EROSION: f64 = 401.0;
const PLANE_RAMP: f64 = 503.0;
const PLANE_RIVER: f64 = 601.0;
const PLANE_RIVER_WIDTH: f64 = 709.0;
const PLANE_ROAD: f64 = 809.0;
const PLANE_HUMIDITY: f64 = 907.0;
const PLANE_TEMPERATURE: f64 = 1009.0;
const PLANE_ROCKINESS: f64 = 1103.0;
const PLANE_SAND: f64 = 1201.0;
const PLANE_GRASS: f64 = 1301.0;
const PLANE_CAVE_THRESHOLD: f64 = 1409.0;
const CAVE_OFFSET: f64 = 7919.0;

/// Everything the materializer and decoration pass need to know about one column.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnSample {
    /// Unstepped base elevation.
    pub base: f64,
    /// World y of the top voxel of the column, water of a river included.
    pub surface: i32,
    /// Voxels of river water carved below `surface`. Zero off rivers.
    pub water_depth: i32,
    pub humidity: f64,
    pub temperature: f64,
    pub rockiness: f64,
    /// Sand band width above water level for this column.
    pub sand_band: f64,
    /// Noise term of the grass expression, in [-1, 1].
    pub grass_noise: f64,
    pub river: bool,
    pub road: bool,
}

impl ColumnSample {
    /// World y of the top solid voxel (the river bed on river columns).
    pub fn ground(&self) -> i32 {
        self.surface - self.water_depth
    }

    pub fn frozen(&self) -> bool {
        is_frozen(self.temperature, self.humidity)
    }
}

pub fn is_frozen(temperature: f64, humidity: f64) -> bool {
    temperature < 32.0 && humidity > 0.25
}

/// Column and voxel terrain queries for one seed and config.
#[derive(Debug, Clone)]
pub struct TerrainModel {
    noise: Noise,
    config: WorldGenConfig,
    ground_bounds: (i32, i32),
}

impl TerrainModel {
    pub fn new(config: WorldGenConfig) -> Self {
        let ground_bounds = ground_bounds(&config);
        Self {
            noise: Noise::new(config.seed),
            config,
            ground_bounds,
        }
    }

    /// Inclusive world y range every column's ground lies in.
    pub fn ground_bounds(&self) -> (i32, i32) {
        self.ground_bounds
    }

    pub fn noise(&self) -> &Noise {
        &self.noise
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.config
    }

    /// Base elevation: water level + offset + amplitude * weighted octave sum.
    pub fn base_elevation(&self, x: i32, z: i32) -> f64 {
        let e = &self.config.elevation;
        let n = self
            .noise
            .octaves2(x as f64, z as f64, PLANE_BASE, &e.octaves);
        self.config.water_level as f64 + e.base_offset + e.amplitude * n
    }

    /// Base rounded up to the plateau step, plus plateau and hill terms, minus erosion.
    pub fn stepped_elevation(&self, x: i32, z: i32, base: f64) -> f64 {
        let e = &self.config.elevation;
        let (fx, fz) = (x as f64, z as f64);
        let step = e.plateau_step as f64;
        let mut h = (base / step).ceil() * step;

        for (i, term) in e.plateaus.iter().enumerate() {
            let offset = i as f64 * 13.0;
            let gate = self
                .noise
                .noise2(fx, fz, PLANE_PLATEAU_GATE + offset, term.gate_frequency);
            if gate > 0.0 {
                let n = self
                    .noise
                    .noise2(fx, fz, PLANE_PLATEAU + offset, term.frequency);
                h += term.amplitude * gate * ((n + 1.0) * 0.5).powf(term.power);
            }
        }

        for (i, term) in e.hills.iter().enumerate() {
            let n = self
                .noise
                .noise2(fx, fz, PLANE_HILL + i as f64 * 13.0, term.frequency);
            h += term.amplitude / (1.0 + (-term.steepness * (n - term.center)).exp());
        }

        let [f1, f2] = e.erosion_frequencies;
        let n1 = (self.noise.noise2(fx, fz, PLANE_EROSION, f1) + 1.0) * 0.5;
        let n2 = (self.noise.noise2(fx, fz, PLANE_EROSION + 13.0, f2) + 1.0) * 0.5;
        h -= e.erosion_amplitude * n1 * n2;

        h
    }

    pub fn humidity(&self, x: i32, z: i32) -> f64 {
        let n = self.noise.octaves2(
            x as f64,
            z as f64,
            PLANE_HUMIDITY,
            &self.config.climate.humidity_octaves,
        );
        ((n + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Temperature at a column whose surface sits at `height`.
    pub fn temperature(&self, x: i32, z: i32, height: i32) -> f64 {
        let c = &self.config.climate;
        let n = self
            .noise
            .octaves2(x as f64, z as f64, PLANE_TEMPERATURE, &c.temperature_octaves);
        let above_water = (height - self.config.water_level).max(0) as f64;
        c.temperature_mean + c.temperature_range * n - c.temperature_lapse * above_water
    }

    /// Full column sample. Ramps, then rivers, then roads.
    pub fn column(&self, x: i32, z: i32) -> ColumnSample {
        let cfg = &self.config;
        let (fx, fz) = (x as f64, z as f64);
        let water_level = cfg.water_level;

        let base = self.base_elevation(x, z);
        let mut elevation = self.stepped_elevation(x, z, base);

        // Ramps
        let step = cfg.elevation.plateau_step as f64;
        let into_step = base - (base / step).floor() * step;
        let to_boundary = into_step.min(step - into_step);
        if to_boundary <= cfg.ramps.band {
            let r = self
                .noise
                .noise2(fx, fz, PLANE_RAMP, cfg.ramps.frequency);
            if r.abs() < cfg.ramps.threshold {
                let mean = self.mean_stepped_elevation(x, z);
                let weight = 1.0 - r.abs() / cfg.ramps.threshold;
                elevation += (mean - elevation) * weight;
            }
        }

        let humidity = self.humidity(x, z);

        // Rivers
        let rv = &cfg.rivers;
        let river_noise = self.noise.noise2(fx, fz, PLANE_RIVER, rv.frequency);
        let width_noise = self
            .noise
            .noise2(fx, fz, PLANE_RIVER_WIDTH, rv.width_frequency);
        let river_width = rv.width + rv.humidity_width * humidity + rv.noise_width * width_noise;
        let mut water_depth = 0;
        let mut river = false;
        if let Some(strength) = band_strength(river_noise, river_width) {
            elevation = pull_down(elevation, base, rv.pull * strength);
            if elevation.round() as i32 > water_level {
                water_depth = (rv.depth * strength).ceil() as i32;
                river = water_depth > 0;
            }
        }

        // Roads
        let mut road = false;
        if !river && elevation.round() as i32 > water_level {
            let rd = &cfg.roads;
            let road_noise = self.noise.noise2(fx, fz, PLANE_ROAD, rd.frequency);
            if let Some(strength) = band_strength(road_noise, rd.width) {
                elevation = pull_toward(elevation, base, rd.pull * strength);
                road = elevation.round() as i32 > water_level;
            }
        }

        let surface = elevation.round() as i32;
        let temperature = self.temperature(x, z, surface);

        let s = &cfg.surface;
        let rock_noise = self
            .noise
            .noise2(fx, fz, PLANE_ROCKINESS, s.rockiness_frequency);
        let rockiness = ((rock_noise + 1.0) * 0.5
            + s.rockiness_height_gain * (surface - water_level).max(0) as f64)
            .clamp(0.0, 1.0);
        let sand_noise = (self.noise.noise2(fx, fz, PLANE_SAND, 0.05) + 1.0) * 0.5;
        let sand_band = s.sand_band + s.sand_band_noise * sand_noise;
        let grass_noise = self
            .noise
            .noise2(fx, fz, PLANE_GRASS, s.grass_frequency);

        ColumnSample {
            base,
            surface,
            water_depth,
            humidity,
            temperature,
            rockiness,
            sand_band,
            grass_noise,
            river,
            road,
        }
    }

    /// Whether a voxel `depth` voxels below the ground surface is carved into a cave.
    pub fn is_cave(&self, x: i32, y: i32, z: i32, depth: i32) -> bool {
        let caves = &self.config.caves;
        if depth <= caves.min_depth {
            return false;
        }
        let depth_f = depth as f64;
        let n = self.noise.octaves3(
            x as f64,
            y as f64,
            z as f64,
            CAVE_OFFSET,
            &caves.octaves,
        );
        let strength = (depth_f / caves.depth_scale).min(1.0);
        let threshold_noise = self.noise.noise2(
            x as f64,
            z as f64,
            PLANE_CAVE_THRESHOLD,
            caves.threshold_frequency,
        );
        let threshold = (caves.threshold + caves.threshold_noise * threshold_noise
            - caves.threshold_falloff * depth_f)
            .max(caves.min_threshold);
        n * strength > threshold
    }

    fn mean_stepped_elevation(&self, x: i32, z: i32) -> f64 {
        let r = self.config.ramps.radius;
        let mut sum = 0.0;
        for dz in -1..=1 {
            for dx in -1..=1 {
                let sx = x + dx * r;
                let sz = z + dz * r;
                sum += self.stepped_elevation(sx, sz, self.base_elevation(sx, sz));
            }
        }
        sum / 9.0
    }
}

/// Strength in (0, 1] of a band around the zero crossing of `n`, or `None` outside it.
fn band_strength(n: f64, width: f64) -> Option<f64> {
    if width <= 0.0 || n.abs() >= width {
        return None;
    }
    Some(1.0 - n.abs() / width)
}

fn pull_toward(value: f64, target: f64, max_pull: f64) -> f64 {
    let max_pull = max_pull.abs();
    value + (target - value).clamp(-max_pull, max_pull)
}

/// Like [`pull_toward`], but never raises `value`.
fn pull_down(value: f64, target: f64, max_pull: f64) -> f64 {
    if target >= value {
        return value;
    }
    value - (value - target).min(max_pull.abs())
}

/// Conservative ground range implied by the elevation amplitudes.
fn ground_bounds(config: &WorldGenConfig) -> (i32, i32) {
    let e = &config.elevation;
    let octave_sum: f64 = e.octaves.iter().map(|o| o.weight.abs()).sum();
    let base_hi = config.water_level as f64 + e.base_offset + e.amplitude.abs() * octave_sum;
    let base_lo = config.water_level as f64 + e.base_offset - e.amplitude.abs() * octave_sum;
    let extra: f64 = e.plateaus.iter().map(|p| p.amplitude.abs()).sum::<f64>()
        + e.hills.iter().map(|h| h.amplitude.abs()).sum::<f64>();
    let hi = base_hi + e.plateau_step.max(0) as f64 + extra;
    let lo = base_lo - extra - e.erosion_amplitude.abs() - config.rivers.depth.abs();
    (lo.floor() as i32 - 1, hi.ceil() as i32 + 1)
}

/// Horizontal ring of extra columns a [`ColumnGrid`] samples around its chunk.
pub const COLUMN_MARGIN: i32 = 2;
const GRID_SIDE: i32 = CHUNK_SIZE_XZ as i32 + 2 * COLUMN_MARGIN;

/// Column samples for one chunk footprint plus a [`COLUMN_MARGIN`] ring.
///
/// Allocated once and refilled per chunk. The ring is only sampled on
/// request since most chunks never look at it.
#[derive(Debug, Clone)]
pub struct ColumnGrid {
    origin_x: i32,
    origin_z: i32,
    samples: Box<[ColumnSample]>,
    margin_ready: bool,
}

impl Default for ColumnGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnGrid {
    pub fn new() -> Self {
        Self {
            origin_x: 0,
            origin_z: 0,
            samples: vec![ColumnSample::default(); (GRID_SIDE * GRID_SIDE) as usize]
                .into_boxed_slice(),
            margin_ready: false,
        }
    }

    /// Sample the chunk footprint whose first column is `(origin_x, origin_z)`.
    pub fn fill_chunk(&mut self, terrain: &TerrainModel, origin_x: i32, origin_z: i32) {
        self.origin_x = origin_x;
        self.origin_z = origin_z;
        self.margin_ready = false;
        let size = CHUNK_SIZE_XZ as i32;
        for lz in 0..size {
            for lx in 0..size {
                self.samples[Self::slot(lx, lz)] = terrain.column(origin_x + lx, origin_z + lz);
            }
        }
    }

    /// Sample the margin ring around the current chunk. Idempotent.
    pub fn fill_margin(&mut self, terrain: &TerrainModel) {
        if self.margin_ready {
            return;
        }
        let size = CHUNK_SIZE_XZ as i32;
        for lz in -COLUMN_MARGIN..size + COLUMN_MARGIN {
            for lx in -COLUMN_MARGIN..size + COLUMN_MARGIN {
                if (0..size).contains(&lx) && (0..size).contains(&lz) {
                    continue;
                }
                self.samples[Self::slot(lx, lz)] =
                    terrain.column(self.origin_x + lx, self.origin_z + lz);
            }
        }
        self.margin_ready = true;
    }

    pub fn margin_ready(&self) -> bool {
        self.margin_ready
    }

    /// Sample of chunk-local column `(lx, lz)`. Margin columns need [`ColumnGrid::fill_margin`].
    pub fn local(&self, lx: i32, lz: i32) -> &ColumnSample {
        debug_assert!(
            self.margin_ready
                || ((0..CHUNK_SIZE_XZ as i32).contains(&lx)
                    && (0..CHUNK_SIZE_XZ as i32).contains(&lz)),
            "margin column ({lx}, {lz}) read before fill_margin"
        );
        &self.samples[Self::slot(lx, lz)]
    }

    fn slot(lx: i32, lz: i32) -> usize {
        debug_assert!((-COLUMN_MARGIN..GRID_SIDE - COLUMN_MARGIN).contains(&lx), "lx out of range");
        debug_assert!((-COLUMN_MARGIN..GRID_SIDE - COLUMN_MARGIN).contains(&lz), "lz out of range");
        ((lx + COLUMN_MARGIN) + (lz + COLUMN_MARGIN) * GRID_SIDE) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_deterministic() {
        let a = TerrainModel::new(WorldGenConfig::default());
        let b = TerrainModel::new(WorldGenConfig::default());
        for i in -20..20 {
            assert_eq!(a.column(i * 13, i * -7), b.column(i * 13, i * -7));
        }
    }

    #[test]
    fn test_humidity_in_range() {
        let t = TerrainModel::new(WorldGenConfig::default());
        for i in -100..100 {
            let h = t.humidity(i * 31, i * 17);
            assert!((0.0..=1.0).contains(&h));
        }
    }

    #[test]
    fn test_stepped_without_terms_is_multiple_of_step() {
        let mut config = WorldGenConfig::default();
        config.elevation.plateaus.clear();
        config.elevation.hills.clear();
        config.elevation.erosion_amplitude = 0.0;
        let t = TerrainModel::new(config);
        for i in -50..50 {
            let base = t.base_elevation(i * 9, i * 4);
            let stepped = t.stepped_elevation(i * 9, i * 4, base);
            assert!(stepped >= base);
            assert_eq!(stepped.rem_euclid(6.0), 0.0);
        }
    }

    #[test]
    fn test_temperature_lapse() {
        let t = TerrainModel::new(WorldGenConfig::default());
        let low = t.temperature(10, 10, t.config().water_level);
        let high = t.temperature(10, 10, t.config().water_level + 50);
        assert!((low - high - 50.0 * t.config().climate.temperature_lapse).abs() < 1e-9);
    }

    #[test]
    fn test_no_caves_near_surface() {
        let t = TerrainModel::new(WorldGenConfig::default());
        for i in 0..200 {
            assert!(!t.is_cave(i, -i, i * 2, t.config().caves.min_depth));
        }
    }

    #[test]
    fn test_river_columns_have_water() {
        let t = TerrainModel::new(WorldGenConfig::default());
        for i in -300..300 {
            let c = t.column(i * 5, i * 3);
            if c.river {
                assert!(c.water_depth > 0);
                assert!(c.surface > t.config().water_level);
                assert!(!c.road);
            } else {
                assert_eq!(c.water_depth, 0);
            }
        }
    }

    #[test]
    fn test_band_strength() {
        assert_eq!(band_strength(0.0, 0.1), Some(1.0));
        assert_eq!(band_strength(0.1, 0.1), None);
        assert_eq!(band_strength(0.05, 0.0), None);
        let s = band_strength(-0.05, 0.1).expect("inside band");
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pull_down_never_raises() {
        assert_eq!(pull_down(10.0, 12.0, 5.0), 10.0);
        assert_eq!(pull_down(10.0, 5.0, 1.5), 8.5);
        assert_eq!(pull_down(10.0, 9.5, 3.0), 9.5);
        assert_eq!(pull_down(10.0, 5.0, -2.0), 8.0);
    }

    #[test]
    fn test_rivers_only_lower_terrain() {
        let mut config = WorldGenConfig::default();
        config.ramps.threshold = 0.0;
        config.rivers.width = 0.2;
        let t = TerrainModel::new(config);
        let mut rivers = 0;
        for i in -400..400 {
            let (x, z) = (i * 7, i * -3);
            let c = t.column(x, z);
            if c.river {
                rivers += 1;
                let stepped = t.stepped_elevation(x, z, t.base_elevation(x, z));
                assert!(c.surface <= stepped.round() as i32, "({x}, {z}) raised by river");
            }
        }
        assert!(rivers > 0, "expected a river column with widened rivers");
    }

    #[test]
    fn test_ground_bounds_hold() {
        let t = TerrainModel::new(WorldGenConfig::default());
        let (lo, hi) = t.ground_bounds();
        assert!(lo < hi);
        for i in -300..300 {
            let c = t.column(i * 37, i * -53);
            assert!(c.ground() >= lo && c.surface <= hi, "{c:?} outside {lo}..={hi}");
        }
    }

    #[test]
    fn test_column_grid_margin() {
        let t = TerrainModel::new(WorldGenConfig::default());
        let mut grid = ColumnGrid::new();
        grid.fill_chunk(&t, -32, 64);
        assert!(!grid.margin_ready());
        assert_eq!(*grid.local(0, 0), t.column(-32, 64));
        assert_eq!(*grid.local(31, 5), t.column(-1, 69));

        grid.fill_margin(&t);
        assert_eq!(*grid.local(-2, -2), t.column(-34, 62));
        assert_eq!(*grid.local(33, 10), t.column(1, 74));
        assert_eq!(*grid.local(4, 33), t.column(-28, 97));

        grid.fill_chunk(&t, 0, 0);
        assert!(!grid.margin_ready());
    }

    #[test]
    fn test_frozen() {
        assert!(is_frozen(20.0, 0.5));
        assert!(!is_frozen(20.0, 0.2));
        assert!(!is_frozen(40.0, 0.9));
    }
}
