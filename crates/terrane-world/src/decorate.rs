//! Post-terrain decoration: rock outcrops, trees, flowers, structures and
//! spawner markers.
//!
//! Everything here is a pure function of the seed, the config and the chunk
//! coordinate. Features rooted in a column are decided from the terrain
//! model alone and written clipped to the chunk, so a tree or structure
//! that crosses a chunk face comes out whole once both chunks exist.

use crate::materialize::surface_block;
use crate::terrain::{ColumnGrid, ColumnSample, TerrainModel, COLUMN_MARGIN};
use glam::{IVec3, Vec3};
use terrane_core::constants::{CHUNK_SIZE_XZ, CHUNK_SIZE_Y};
use terrane_core::math::world_to_chunk;
use terrane_core::{BlockType, ChunkBuffer, ChunkFlags, Decoration, DecorationKind, Voxel};

const SALT_OUTCROP: u32 = 0x0C7_0001;
const SALT_OUTCROP_RADIUS: u32 = 0x0C7_0002;
const SALT_TREE: u32 = 0x7EE_0001;
const SALT_FLOWER: u32 = 0xF10_0001;
const SALT_STRUCTURE: u32 = 0x57C_0001;
const SALT_STRUCTURE_X: u32 = 0x57C_0002;
const SALT_STRUCTURE_Z: u32 = 0x57C_0003;
const SALT_STRUCTURE_KIND: u32 = 0x57C_0004;
const SALT_SPAWNER: u32 = 0x5A0_0001;
const SALT_SPAWNER_X: u32 = 0x5A0_0002;
const SALT_SPAWNER_Z: u32 = 0x5A0_0003;

const PLANE_FLOWER: f64 = 2003.0;

/// Furthest horizontal reach of any structure from its anchor.
pub const STRUCTURE_REACH: i32 = 4;

/// Furthest horizontal reach of a tree or outcrop from its root column.
pub const TREE_REACH: i32 = COLUMN_MARGIN;

/// Column features span ground + `FEATURE_BOTTOM` ..= ground + `FEATURE_TOP`.
const FEATURE_BOTTOM: i32 = -1;
const FEATURE_TOP: i32 = 9;

/// Run the decoration pass over a freshly materialized chunk.
///
/// `columns` must hold this chunk's footprint; its margin ring is sampled
/// here when column features can reach the chunk. Column features need air
/// to grow into; spawners need both ground and air inside the chunk.
/// Structures are stamped regardless.
pub fn decorate(terrain: &TerrainModel, columns: &mut ColumnGrid, buffer: &mut ChunkBuffer) {
    let flags = buffer.flags();

    if flags.contains(ChunkFlags::AIR) && features_may_reach(terrain, buffer.origin().y) {
        columns.fill_margin(terrain);
        decorate_columns(terrain, columns, buffer);
    }

    stamp_structures(terrain, buffer);

    if flags.contains(ChunkFlags::SOLID) && flags.contains(ChunkFlags::AIR) {
        place_spawners(terrain, columns, buffer);
    }
}

fn features_may_reach(terrain: &TerrainModel, chunk_y0: i32) -> bool {
    let (lo, hi) = terrain.ground_bounds();
    let chunk_y1 = chunk_y0 + CHUNK_SIZE_Y as i32 - 1;
    hi + FEATURE_TOP >= chunk_y0 && lo + FEATURE_BOTTOM <= chunk_y1
}

/// Top solid ground voxel of a local column, if the voxel above it is open.
///
/// Stops at the first solid non-foliage voxel from the top; cave floors
/// under it are never reported.
pub fn find_surface(buffer: &ChunkBuffer, x: u32, z: u32) -> Option<u32> {
    for y in (0..CHUNK_SIZE_Y - 1).rev() {
        let block = buffer.get(x, y, z).block();
        if block.is_solid() && !block.is_liquid() && !block.is_foliage() {
            let above = buffer.get(x, y + 1, z).block();
            return (above == BlockType::Air || above.is_foliage()).then_some(y);
        }
    }
    None
}

/// Like [`find_surface`], but only when the open voxel is the column's
/// terrain ground, not a cave floor or a structure roof.
fn ground_surface(buffer: &ChunkBuffer, column: &ColumnSample, x: u32, z: u32) -> Option<u32> {
    let ly = find_surface(buffer, x, z)?;
    (buffer.origin().y + ly as i32 == column.ground()).then_some(ly)
}

/// World y and block of a column's ground when it is open to the sky.
/// River beds and anything at or below water level are covered.
fn open_ground(terrain: &TerrainModel, column: &ColumnSample) -> Option<(i32, BlockType)> {
    let ground = column.ground();
    if column.water_depth > 0 || ground < terrain.config().water_level {
        return None;
    }
    Some((ground, surface_block(terrain.config(), column)))
}

/// What a single column grows, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnFeature {
    Outcrop(i32),
    Tree(TreeShape, bool),
    Flower(BlockType),
}

fn column_feature(
    terrain: &TerrainModel,
    column: &ColumnSample,
    ground_block: BlockType,
    world: IVec3,
) -> Option<ColumnFeature> {
    let noise = terrain.noise();
    let veg = &terrain.config().vegetation;
    let (x, y, z) = (world.x, world.y, world.z);

    if noise.white_noise01(x, y, z, SALT_OUTCROP) < veg.outcrop_chance {
        let radius = if noise.white_noise01(x, y, z, SALT_OUTCROP_RADIUS) > 0.5 {
            2
        } else {
            1
        };
        return Some(ColumnFeature::Outcrop(radius));
    }

    if matches!(ground_block, BlockType::Grass | BlockType::Snow)
        && noise.white_noise01(x, y, z, SALT_TREE) < veg.tree_chance * column.humidity
    {
        let shape = TreeShape::pick(column.humidity, column.temperature);
        return Some(ColumnFeature::Tree(shape, (x + z) & 1 == 0));
    }

    if matches!(ground_block, BlockType::Grass | BlockType::Dirt)
        && noise.white_noise01(x, y, z, SALT_FLOWER) < veg.flower_chance
    {
        return Some(ColumnFeature::Flower(pick_flower(terrain, x, z)));
    }
    None
}

/// Grow column features rooted anywhere within [`TREE_REACH`] of the chunk.
/// Roots are visited in world order so overlapping features resolve the
/// same way in every chunk they touch.
fn decorate_columns(terrain: &TerrainModel, columns: &ColumnGrid, buffer: &mut ChunkBuffer) {
    let origin = buffer.origin();
    let chunk_y1 = origin.y + CHUNK_SIZE_Y as i32 - 1;
    let size = CHUNK_SIZE_XZ as i32;

    for lz in -TREE_REACH..size + TREE_REACH {
        for lx in -TREE_REACH..size + TREE_REACH {
            let column = columns.local(lx, lz);
            let Some((ground, block)) = open_ground(terrain, column) else {
                continue;
            };
            if ground + FEATURE_TOP < origin.y || ground + FEATURE_BOTTOM > chunk_y1 {
                continue;
            }
            let world = IVec3::new(origin.x + lx, ground, origin.z + lz);
            let Some(feature) = column_feature(terrain, column, block, world) else {
                continue;
            };
            if inside_structure(terrain, world.x, world.z) {
                continue;
            }

            let root = world + IVec3::Y;
            match feature {
                ColumnFeature::Outcrop(radius) => place_outcrop(buffer, root, radius),
                ColumnFeature::Tree(shape, parity) => place_tree(buffer, root, shape, parity),
                ColumnFeature::Flower(flower) => {
                    if buffer.get_world(root).is_some_and(|v| v.is_air()) {
                        buffer.set_world(root, Voxel::from(flower));
                    }
                }
            }
        }
    }
}

/// Fill air within `radius` of `center` (world) with rock, clipped to the chunk.
fn place_outcrop(buffer: &mut ChunkBuffer, center: IVec3, radius: i32) {
    let r2 = radius * radius + radius;
    for dy in -radius..=radius {
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy + dz * dz > r2 {
                    continue;
                }
                let p = center + IVec3::new(dx, dy, dz);
                if buffer.get_world(p).is_some_and(|v| v.is_air()) {
                    buffer.set_world(p, Voxel::from(BlockType::Rock));
                }
            }
        }
    }
}

/// Tree silhouettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    Oak,
    Birch,
    Pine,
    Shrub,
}

impl TreeShape {
    pub fn pick(humidity: f64, temperature: f64) -> TreeShape {
        if temperature < 40.0 {
            TreeShape::Pine
        } else if humidity > 0.7 {
            TreeShape::Oak
        } else if humidity > 0.45 {
            TreeShape::Birch
        } else {
            TreeShape::Shrub
        }
    }

    pub fn trunk_height(self) -> i32 {
        match self {
            TreeShape::Oak => 5,
            TreeShape::Birch => 6,
            TreeShape::Pine => 7,
            TreeShape::Shrub => 0,
        }
    }

    /// Visit every voxel offset from the trunk base, trunk first.
    pub fn for_each_voxel(self, parity: bool, mut emit: impl FnMut(IVec3, BlockType)) {
        for dy in 0..self.trunk_height() {
            emit(IVec3::new(0, dy, 0), BlockType::Wood);
        }
        let mut layer = |dy: i32, radius: i32, keep: &dyn Fn(i32, i32) -> bool, block: BlockType| {
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    if keep(dx, dz) {
                        emit(IVec3::new(dx, dy, dz), block);
                    }
                }
            }
        };
        let square = |_: i32, _: i32| true;
        let plus = |dx: i32, dz: i32| dx.abs() + dz.abs() <= 1;
        let diamond = |dx: i32, dz: i32| dx.abs() + dz.abs() <= 2;
        let rounded = |dx: i32, dz: i32| !(dx.abs() == 2 && dz.abs() == 2);
        let rounded_parity = |dx: i32, dz: i32| parity || !(dx.abs() == 2 && dz.abs() == 2);
        let no_corners = |dx: i32, dz: i32| !(dx.abs() == 1 && dz.abs() == 1);
        let corners_on_parity = |dx: i32, dz: i32| parity || !(dx.abs() == 1 && dz.abs() == 1);
        let pine_skirt = |dx: i32, dz: i32| if parity { diamond(dx, dz) } else { plus(dx, dz) };

        match self {
            TreeShape::Oak => {
                layer(3, 2, &rounded, BlockType::Leaves);
                layer(4, 2, &rounded_parity, BlockType::Leaves);
                layer(5, 1, &square, BlockType::Leaves);
                layer(6, 1, &plus, BlockType::Leaves);
            }
            TreeShape::Birch => {
                layer(4, 1, &corners_on_parity, BlockType::Leaves);
                layer(5, 1, &square, BlockType::Leaves);
                layer(6, 1, &square, BlockType::Leaves);
                layer(7, 1, &no_corners, BlockType::Leaves);
            }
            TreeShape::Pine => {
                layer(2, 2, &diamond, BlockType::Needles);
                layer(3, 2, &pine_skirt, BlockType::Needles);
                layer(4, 1, &square, BlockType::Needles);
                layer(5, 1, &plus, BlockType::Needles);
                layer(6, 1, &plus, BlockType::Needles);
                layer(7, 0, &square, BlockType::Needles);
                layer(8, 0, &square, BlockType::Needles);
            }
            TreeShape::Shrub => {
                layer(0, 1, &corners_on_parity, BlockType::Leaves);
                layer(1, 1, &plus, BlockType::Leaves);
            }
        }
    }
}

/// Write a tree with its trunk base at `base` (world), clipped to the chunk.
/// Leaves only fill air; the trunk may also replace foliage.
fn place_tree(buffer: &mut ChunkBuffer, base: IVec3, shape: TreeShape, parity: bool) {
    shape.for_each_voxel(parity, |offset, block| {
        let p = base + offset;
        let Some(current) = buffer.get_world(p) else {
            return;
        };
        let current = current.block();
        if current == BlockType::Air || (block == BlockType::Wood && current.is_foliage()) {
            buffer.set_world(p, Voxel::from(block));
        }
    });
}

/// Argmax of four independently weighted noise sums.
fn pick_flower(terrain: &TerrainModel, x: i32, z: i32) -> BlockType {
    const WEIGHTS: [[f64; 2]; 4] = [[1.0, 0.5], [0.9, 0.6], [1.1, 0.4], [0.8, 0.7]];
    let noise = terrain.noise();
    let freq = terrain.config().vegetation.flower_frequency;
    let (fx, fz) = (x as f64, z as f64);

    let mut best = 0;
    let mut best_score = f64::MIN;
    for (i, [w0, w1]) in WEIGHTS.iter().enumerate() {
        let plane = PLANE_FLOWER + i as f64 * 31.0;
        let score = w0 * noise.noise2(fx, fz, plane, freq)
            + w1 * noise.noise2(fx, fz, plane + 11.0, freq * 2.7);
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    BlockType::FLOWERS[best]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Tower,
    TradingPost,
}

impl StructureKind {
    pub fn decoration_kind(self) -> DecorationKind {
        match self {
            StructureKind::Tower => DecorationKind::Tower,
            StructureKind::TradingPost => DecorationKind::TradingPost,
        }
    }

    /// Half extents `(x, z)` of the widest layer around the anchor.
    pub fn half_extent(self) -> (i32, i32) {
        match self {
            StructureKind::Tower => (2, 2),
            StructureKind::TradingPost => (4, 3),
        }
    }
}

/// A structure candidate resolved from its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructurePlan {
    pub kind: StructureKind,
    /// World position of the first voxel above ground at the footprint center.
    pub anchor: IVec3,
}

/// The structure in cell `(cell_x, cell_z)`, if any.
pub fn structure_in_cell(terrain: &TerrainModel, cell_x: i32, cell_z: i32) -> Option<StructurePlan> {
    let cfg = &terrain.config().structures;
    if !cfg.enabled {
        return None;
    }
    let noise = terrain.noise();
    if noise.white_noise01(cell_x, 0, cell_z, SALT_STRUCTURE) >= cfg.chance {
        return None;
    }
    let span = (cfg.cell - 2 * cfg.margin).max(1);
    let offset = |salt: u32| -> i32 {
        ((noise.white_noise01(cell_x, 0, cell_z, salt) * span as f64) as i32).min(span - 1)
    };
    let ax = cell_x * cfg.cell + cfg.margin + offset(SALT_STRUCTURE_X);
    let az = cell_z * cfg.cell + cfg.margin + offset(SALT_STRUCTURE_Z);

    let column = terrain.column(ax, az);
    if column.river || column.surface <= terrain.config().water_level {
        return None;
    }

    let kind = if noise.white_noise01(cell_x, 0, cell_z, SALT_STRUCTURE_KIND) < 0.5 {
        StructureKind::Tower
    } else {
        StructureKind::TradingPost
    };
    Some(StructurePlan {
        kind,
        anchor: IVec3::new(ax, column.surface + 1, az),
    })
}

/// Whether any structure's footprint covers world column `(x, z)`.
fn inside_structure(terrain: &TerrainModel, x: i32, z: i32) -> bool {
    let cfg = &terrain.config().structures;
    if !cfg.enabled {
        return false;
    }
    for cz in cell_range(z - STRUCTURE_REACH, z + STRUCTURE_REACH, cfg.cell) {
        for cx in cell_range(x - STRUCTURE_REACH, x + STRUCTURE_REACH, cfg.cell) {
            if structure_in_cell(terrain, cx, cz).is_some_and(|plan| plan.covers(x, z)) {
                return true;
            }
        }
    }
    false
}

impl StructurePlan {
    pub fn covers(&self, x: i32, z: i32) -> bool {
        let (hx, hz) = self.kind.half_extent();
        (x - self.anchor.x).abs() <= hx && (z - self.anchor.z).abs() <= hz
    }

    /// Visit the world-space voxels of the structure, interior air included.
    pub fn for_each_voxel(&self, mut emit: impl FnMut(IVec3, BlockType)) {
        let a = self.anchor;
        match self.kind {
            StructureKind::Tower => {
                let height = 12;
                for dy in -4..0 {
                    for dz in -2..=2 {
                        for dx in -2..=2 {
                            emit(a + IVec3::new(dx, dy, dz), BlockType::Brick);
                        }
                    }
                }
                for dy in 0..height {
                    for dz in -2i32..=2 {
                        for dx in -2i32..=2 {
                            let wall = dx.abs() == 2 || dz.abs() == 2;
                            let door = dx == 0 && dz == -2 && dy < 2;
                            let block = if wall && !door {
                                BlockType::Brick
                            } else {
                                BlockType::Air
                            };
                            emit(a + IVec3::new(dx, dy, dz), block);
                        }
                    }
                }
                for dz in -2i32..=2 {
                    for dx in -2i32..=2 {
                        emit(a + IVec3::new(dx, height, dz), BlockType::Plank);
                        let rim = dx.abs() == 2 || dz.abs() == 2;
                        if rim && (dx + dz) % 2 == 0 {
                            emit(a + IVec3::new(dx, height + 1, dz), BlockType::Brick);
                        }
                    }
                }
            }
            StructureKind::TradingPost => {
                let height = 3;
                for dy in -3..0 {
                    for dz in -2..=2 {
                        for dx in -3..=3 {
                            emit(a + IVec3::new(dx, dy, dz), BlockType::Plank);
                        }
                    }
                }
                for dy in 0..height {
                    for dz in -2i32..=2 {
                        for dx in -3i32..=3 {
                            let wall = dx.abs() == 3 || dz.abs() == 2;
                            let door = dx == 0 && dz == -2 && dy < 2;
                            let block = if wall && !door {
                                BlockType::Plank
                            } else {
                                BlockType::Air
                            };
                            emit(a + IVec3::new(dx, dy, dz), block);
                        }
                    }
                }
                for dz in -3..=3 {
                    for dx in -4..=4 {
                        emit(a + IVec3::new(dx, height, dz), BlockType::Thatch);
                    }
                }
                for dz in -1..=1 {
                    for dx in -3..=3 {
                        emit(a + IVec3::new(dx, height + 1, dz), BlockType::Thatch);
                    }
                }
            }
        }
    }

    /// Decorations recorded in the anchor chunk.
    pub fn decorations(&self) -> [Decoration; 2] {
        let base = self.anchor.as_vec3() + Vec3::new(0.5, 0.0, 0.5);
        let marker = Decoration {
            position: base,
            kind: self.kind.decoration_kind(),
        };
        match self.kind {
            StructureKind::Tower => [
                marker,
                Decoration {
                    position: base + Vec3::new(0.0, 13.0, 0.0),
                    kind: DecorationKind::MapReveal,
                },
            ],
            StructureKind::TradingPost => [
                marker,
                Decoration {
                    position: base,
                    kind: DecorationKind::Merchant,
                },
            ],
        }
    }
}

/// Cells of size `cell` overlapping world range `[lo, hi]` on one axis.
fn cell_range(lo: i32, hi: i32, cell: i32) -> std::ops::RangeInclusive<i32> {
    lo.div_euclid(cell)..=hi.div_euclid(cell)
}

fn stamp_structures(terrain: &TerrainModel, buffer: &mut ChunkBuffer) {
    let cfg = &terrain.config().structures;
    if !cfg.enabled {
        return;
    }
    let origin = buffer.origin();
    let size = CHUNK_SIZE_XZ as i32;
    let xs = cell_range(origin.x - STRUCTURE_REACH, origin.x + size - 1 + STRUCTURE_REACH, cfg.cell);
    let zs = cell_range(origin.z - STRUCTURE_REACH, origin.z + size - 1 + STRUCTURE_REACH, cfg.cell);
    let y_lo = origin.y;
    let y_hi = origin.y + CHUNK_SIZE_Y as i32 - 1;

    for cz in zs {
        for cx in xs.clone() {
            let Some(plan) = structure_in_cell(terrain, cx, cz) else {
                continue;
            };
            let a = plan.anchor;
            let touches = (a.x - STRUCTURE_REACH..=a.x + STRUCTURE_REACH)
                .any(|x| x >= origin.x && x < origin.x + size)
                && (a.z - STRUCTURE_REACH..=a.z + STRUCTURE_REACH)
                    .any(|z| z >= origin.z && z < origin.z + size)
                && a.y - 4 <= y_hi
                && a.y + 14 >= y_lo;
            if !touches {
                continue;
            }

            plan.for_each_voxel(|pos, block| {
                buffer.set_world(pos, Voxel::from(block));
            });
            if world_to_chunk(a) == buffer.coord() {
                for decoration in plan.decorations() {
                    buffer.decorations_mut().push(decoration);
                }
            }
            // At most one structure per chunk.
            return;
        }
    }
}

fn place_spawners(terrain: &TerrainModel, columns: &ColumnGrid, buffer: &mut ChunkBuffer) {
    let s = &terrain.config().spawners;
    let kinds = [
        (DecorationKind::MonsterSpawn, s.monster_cell, s.monster_chance),
        (DecorationKind::Merchant, s.merchant_cell, s.merchant_chance),
        (DecorationKind::Horse, s.horse_cell, s.horse_chance),
        (DecorationKind::Chest, s.chest_cell, s.chest_chance),
        (DecorationKind::MapReveal, s.map_reveal_cell, s.map_reveal_chance),
    ];
    let noise = terrain.noise();
    let origin = buffer.origin();
    let size = CHUNK_SIZE_XZ as i32;

    for (kind, cell, chance) in kinds {
        let k = kind as i32;
        for cz in cell_range(origin.z, origin.z + size - 1, cell) {
            for cx in cell_range(origin.x, origin.x + size - 1, cell) {
                if noise.white_noise01(cx, k, cz, SALT_SPAWNER) >= chance {
                    continue;
                }
                let pick = |salt: u32| ((noise.white_noise01(cx, k, cz, salt) * cell as f64) as i32).min(cell - 1);
                let px = cx * cell + pick(SALT_SPAWNER_X);
                let pz = cz * cell + pick(SALT_SPAWNER_Z);
                let (lx, lz) = (px - origin.x, pz - origin.z);
                if lx < 0 || lz < 0 || lx >= size || lz >= size {
                    continue;
                }
                let column = columns.local(lx, lz);
                let Some(ly) = ground_surface(buffer, column, lx as u32, lz as u32) else {
                    continue;
                };
                let position = Vec3::new(
                    px as f32 + 0.5,
                    (origin.y + ly as i32 + 1) as f32,
                    pz as f32 + 0.5,
                );
                buffer.decorations_mut().push(Decoration { position, kind });
            }
        }
    }
}
