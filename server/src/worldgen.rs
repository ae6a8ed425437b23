//! Procedural town generation and spawn placement.
//!
//! Stages run in a fixed order (roads, lakes, houses, trees) and each stage
//! only inspects blocks laid down by the stages before it, so a given seed
//! always produces the same town.

use crate::blocks::BlockStore;
use crate::physics::{collides, Aabb};
use log::info;
use rand::Rng;
use shared::{BlockType, Vec3, WORLD_MAX_Y, WORLD_MIN_Y};

/// Generated area is `[-GEN_HALF_EXTENT, GEN_HALF_EXTENT)` on x and z.
pub const GEN_HALF_EXTENT: i32 = 64;

const ROAD_SPACING: i32 = 16;
const ROAD_WIDTH: i32 = 3;

const RANDOM_LAKES: usize = 3;
/// Centre and radii of the lake that always sits next to spawn.
const FIXED_LAKE: Lake = Lake {
    cx: 8,
    cz: 8,
    rx: 4.5,
    rz: 3.5,
};

const HOUSE_CHANCE: f64 = 0.6;
const HOUSE_SIZE: i32 = 7;
const WALL_HEIGHT: i32 = 3;

const TREE_COUNT: usize = 80;
const TRUNK_HEIGHT: i32 = 4;
/// Manhattan radius of each canopy layer, bottom to top.
const CANOPY_RADII: [i32; 3] = [3, 2, 1];

const SPAWN_NUDGES: [f32; 3] = [0.0, 0.5, 1.0];
const FALLBACK_SPAWN_HEIGHT: f32 = 32.0;

#[derive(Debug, Clone, Copy)]
struct Lake {
    cx: i32,
    cz: i32,
    rx: f32,
    rz: f32,
}

impl Lake {
    fn contains(&self, x: i32, z: i32) -> bool {
        let dx = (x - self.cx) as f32 / self.rx;
        let dz = (z - self.cz) as f32 / self.rz;
        dx * dx + dz * dz <= 1.0
    }
}

fn in_generated_area(x: i32, z: i32) -> bool {
    (-GEN_HALF_EXTENT..GEN_HALF_EXTENT).contains(&x)
        && (-GEN_HALF_EXTENT..GEN_HALF_EXTENT).contains(&z)
}

fn is_road_line(v: i32) -> bool {
    v.rem_euclid(ROAD_SPACING) < ROAD_WIDTH
}

/// Fills `blocks` with a town derived from `rng`.
pub fn generate(blocks: &mut BlockStore, rng: &mut impl Rng) {
    lay_roads(blocks);
    dig_lakes(blocks, rng);
    let houses = build_houses(blocks, rng);
    let trees = plant_trees(blocks, rng);
    info!(
        "Generated town: {} blocks, {} houses, {} trees",
        blocks.len(),
        houses,
        trees
    );
}

fn lay_roads(blocks: &mut BlockStore) {
    for x in -GEN_HALF_EXTENT..GEN_HALF_EXTENT {
        for z in -GEN_HALF_EXTENT..GEN_HALF_EXTENT {
            if is_road_line(x) || is_road_line(z) {
                blocks.set_block(x, 0, z, BlockType::Road);
            }
        }
    }
}

fn dig_lakes(blocks: &mut BlockStore, rng: &mut impl Rng) {
    let mut lakes = vec![FIXED_LAKE];
    for _ in 0..RANDOM_LAKES {
        lakes.push(Lake {
            cx: rng.gen_range(-GEN_HALF_EXTENT + 8..GEN_HALF_EXTENT - 8),
            cz: rng.gen_range(-GEN_HALF_EXTENT + 8..GEN_HALF_EXTENT - 8),
            rx: rng.gen_range(3.0..8.0),
            rz: rng.gen_range(3.0..8.0),
        });
    }

    for lake in &lakes {
        let reach_x = lake.rx.ceil() as i32;
        let reach_z = lake.rz.ceil() as i32;
        for x in lake.cx - reach_x..=lake.cx + reach_x {
            for z in lake.cz - reach_z..=lake.cz + reach_z {
                if lake.contains(x, z) && in_generated_area(x, z) {
                    // Roads bridge over water.
                    blocks.set_if_empty(x, 0, z, BlockType::Water);
                }
            }
        }
    }
}

fn build_houses(blocks: &mut BlockStore, rng: &mut impl Rng) -> usize {
    let mut built = 0;
    for lot_x in (-GEN_HALF_EXTENT..GEN_HALF_EXTENT).step_by(ROAD_SPACING as usize) {
        for lot_z in (-GEN_HALF_EXTENT..GEN_HALF_EXTENT).step_by(ROAD_SPACING as usize) {
            if !rng.gen_bool(HOUSE_CHANCE) {
                continue;
            }
            let x0 = lot_x + ROAD_WIDTH + 1;
            let z0 = lot_z + ROAD_WIDTH + 1;
            let blocked = (x0..x0 + HOUSE_SIZE)
                .any(|x| (z0..z0 + HOUSE_SIZE).any(|z| blocks.block_at(x, 0, z).is_some()));
            if blocked {
                continue;
            }
            build_house(blocks, x0, z0);
            built += 1;
        }
    }
    built
}

/// Stone floor, wooden walls with a door facing the road on the low-z side,
/// a glass window opposite the door, and a flat roof.
fn build_house(blocks: &mut BlockStore, x0: i32, z0: i32) {
    let x1 = x0 + HOUSE_SIZE - 1;
    let z1 = z0 + HOUSE_SIZE - 1;
    let mid_x = x0 + HOUSE_SIZE / 2;

    for x in x0..=x1 {
        for z in z0..=z1 {
            blocks.set_block(x, 0, z, BlockType::Stone);
            blocks.set_block(x, WALL_HEIGHT + 1, z, BlockType::Roof);

            let on_wall = x == x0 || x == x1 || z == z0 || z == z1;
            if !on_wall {
                continue;
            }
            for y in 1..=WALL_HEIGHT {
                let door = z == z0 && x == mid_x && y <= 2;
                if door {
                    continue;
                }
                let window = z == z1 && x == mid_x && y == 2;
                let block = if window {
                    BlockType::Glass
                } else {
                    BlockType::Wood
                };
                blocks.set_block(x, y, z, block);
            }
        }
    }
}

fn plant_trees(blocks: &mut BlockStore, rng: &mut impl Rng) -> usize {
    let mut planted = 0;
    let mut attempts = 0;
    while planted < TREE_COUNT && attempts < TREE_COUNT * 10 {
        attempts += 1;
        let x = rng.gen_range(-GEN_HALF_EXTENT + 3..GEN_HALF_EXTENT - 3);
        let z = rng.gen_range(-GEN_HALF_EXTENT + 3..GEN_HALF_EXTENT - 3);
        // Roads, water and house floors all occupy y=0.
        if blocks.block_at(x, 0, z).is_some() {
            continue;
        }
        let crowded = (1..TRUNK_HEIGHT + CANOPY_RADII.len() as i32)
            .any(|y| blocks.block_at(x, y, z).is_some());
        if crowded {
            continue;
        }
        plant_tree(blocks, x, z);
        planted += 1;
    }
    planted
}

fn plant_tree(blocks: &mut BlockStore, x: i32, z: i32) {
    for y in 0..TRUNK_HEIGHT {
        blocks.set_block(x, y, z, BlockType::Wood);
    }
    for (layer, radius) in CANOPY_RADII.iter().enumerate() {
        let y = TRUNK_HEIGHT - 1 + layer as i32;
        for dx in -radius..=*radius {
            for dz in -radius..=*radius {
                if dx.abs() + dz.abs() <= *radius {
                    blocks.set_if_empty(x + dx, y, z + dz, BlockType::Leaves);
                }
            }
        }
    }
}

/// Finds a standing spot near `(cx, cz)` scanning rings of growing radius.
///
/// A column qualifies when its first solid cell with two free cells above
/// has no water on top. The hitbox is tested at 2 units above that ground
/// and nudged upward up to one metre.
pub fn find_safe_spawn(blocks: &BlockStore, cx: i32, cz: i32, radius: i32) -> Vec3 {
    for r in 0..=radius {
        for (x, z) in ring(cx, cz, r) {
            if let Some(spot) = spawn_candidate(blocks, x, z) {
                return spot;
            }
        }
    }
    Vec3::new(cx as f32 + 0.5, FALLBACK_SPAWN_HEIGHT, cz as f32 + 0.5)
}

pub(crate) fn ring(cx: i32, cz: i32, r: i32) -> Vec<(i32, i32)> {
    if r == 0 {
        return vec![(cx, cz)];
    }
    let mut cells = Vec::with_capacity((8 * r) as usize);
    for d in -r..=r {
        cells.push((cx + d, cz - r));
        cells.push((cx + d, cz + r));
    }
    for d in -r + 1..r {
        cells.push((cx - r, cz + d));
        cells.push((cx + r, cz + d));
    }
    cells
}

fn spawn_candidate(blocks: &BlockStore, x: i32, z: i32) -> Option<Vec3> {
    let ground = (WORLD_MIN_Y - 1..WORLD_MAX_Y).find(|&y| {
        blocks.is_solid(x, y, z) && !blocks.is_solid(x, y + 1, z) && !blocks.is_solid(x, y + 2, z)
    })?;
    if blocks.is_water(x, ground + 1, z) {
        return None;
    }
    let base = Vec3::new(x as f32 + 0.5, ground as f32 + 2.0, z as f32 + 0.5);
    SPAWN_NUDGES
        .iter()
        .map(|nudge| base + Vec3::new(0.0, *nudge, 0.0))
        .find(|candidate| !collides(blocks, &Aabb::for_entity(*candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generated(seed: u64) -> BlockStore {
        let mut blocks = BlockStore::new();
        let mut rng = StdRng::seed_from_u64(seed);
        generate(&mut blocks, &mut rng);
        blocks
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generated(12345);
        let b = generated(12345);
        assert_eq!(a.len(), b.len());
        for record in a.records() {
            assert_eq!(b.block_at(record.x, record.y, record.z), Some(record.block));
        }
    }

    #[test]
    fn test_road_grid() {
        let blocks = generated(1);
        assert_eq!(blocks.block_at(0, 0, 0), Some(BlockType::Road));
        assert_eq!(blocks.block_at(16, 0, 37), Some(BlockType::Road));
        assert_eq!(blocks.block_at(-62, 0, -16), Some(BlockType::Road));
    }

    #[test]
    fn test_fixed_lake_is_water_off_road() {
        let blocks = generated(7);
        assert_eq!(blocks.block_at(8, 0, 8), Some(BlockType::Water));
        for record in blocks.records() {
            if record.block == BlockType::Water {
                assert_eq!(record.y, 0);
                assert!(!is_road_line(record.x) && !is_road_line(record.z));
            }
        }
    }

    #[test]
    fn test_houses_never_stand_on_water() {
        let blocks = generated(99);
        for record in blocks.records() {
            if record.block == BlockType::Roof {
                let below = blocks.block_at(record.x, 0, record.z);
                assert_eq!(below, Some(BlockType::Stone));
            }
        }
    }

    #[test]
    fn test_tree_canopy_within_manhattan_three() {
        let mut blocks = BlockStore::new();
        plant_tree(&mut blocks, 0, 0);
        for record in blocks.records() {
            if record.block == BlockType::Leaves {
                assert!(record.x.abs() + record.z.abs() <= 3);
                assert!((3..=5).contains(&record.y));
            }
        }
        assert_eq!(blocks.block_at(0, 3, 0), Some(BlockType::Wood));
        assert_eq!(blocks.block_at(0, 4, 0), Some(BlockType::Leaves));
    }

    #[test]
    fn test_house_has_door_and_window() {
        let mut blocks = BlockStore::new();
        build_house(&mut blocks, 0, 0);
        assert_eq!(blocks.block_at(3, 1, 0), None);
        assert_eq!(blocks.block_at(3, 2, 0), None);
        assert_eq!(blocks.block_at(3, 3, 0), Some(BlockType::Wood));
        assert_eq!(blocks.block_at(3, 2, 6), Some(BlockType::Glass));
        assert_eq!(blocks.block_at(3, 4, 3), Some(BlockType::Roof));
        assert_eq!(blocks.block_at(3, 1, 3), None);
    }

    #[test]
    fn test_spawn_on_empty_world() {
        let blocks = BlockStore::new();
        let spot = find_safe_spawn(&blocks, 0, 0, 8);
        assert_eq!(spot, Vec3::new(0.5, 1.0, 0.5));
    }

    #[test]
    fn test_spawn_avoids_lake() {
        let mut blocks = BlockStore::new();
        for x in -3..=3 {
            for z in -3..=3 {
                blocks.set_block(x, 0, z, BlockType::Water);
            }
        }
        let spot = find_safe_spawn(&blocks, 0, 0, 8);
        let (x, z) = (spot.x.floor() as i32, spot.z.floor() as i32);
        assert!(!blocks.is_water(x, 0, z));
        assert!(x.abs() == 4 || z.abs() == 4);
    }

    #[test]
    fn test_spawn_skips_covered_column() {
        let mut blocks = BlockStore::new();
        // Ceiling right above the ground leaves no two-cell gap.
        blocks.set_block(0, 1, 0, BlockType::Stone);
        let spot = find_safe_spawn(&blocks, 0, 0, 4);
        assert!(!collides(&blocks, &Aabb::for_entity(spot)));
    }

    #[test]
    fn test_spawn_fallback_when_nothing_fits() {
        let mut blocks = BlockStore::new();
        for x in -1..=1 {
            for z in -1..=1 {
                blocks.set_block(x, 0, z, BlockType::Water);
            }
        }
        let spot = find_safe_spawn(&blocks, 0, 0, 1);
        assert_eq!(spot, Vec3::new(0.5, FALLBACK_SPAWN_HEIGHT, 0.5));
    }

    #[test]
    fn test_ring_perimeter_size() {
        assert_eq!(ring(0, 0, 0).len(), 1);
        assert_eq!(ring(0, 0, 1).len(), 8);
        assert_eq!(ring(5, -5, 3).len(), 24);
    }
}
