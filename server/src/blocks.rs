//! Sparse voxel storage.
//!
//! Only occupied cells are stored. Everything below `WORLD_MIN_Y` behaves as an
//! implicit solid floor, so the world needs no bedrock layer.

use shared::{BlockRecord, BlockType, WORLD_HORIZONTAL_LIMIT, WORLD_MAX_Y, WORLD_MIN_Y};
use std::collections::HashMap;

/// Integer voxel coordinate used as the map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Whether a block may be stored at this coordinate.
    pub fn in_bounds(&self) -> bool {
        (WORLD_MIN_Y..WORLD_MAX_Y).contains(&self.y)
            && (-WORLD_HORIZONTAL_LIMIT..WORLD_HORIZONTAL_LIMIT).contains(&self.x)
            && (-WORLD_HORIZONTAL_LIMIT..WORLD_HORIZONTAL_LIMIT).contains(&self.z)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: HashMap<BlockPos, BlockType>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `block` at the coordinate.
    ///
    /// Returns false when the cell already holds the same type or the
    /// coordinate is out of bounds.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> bool {
        let pos = BlockPos::new(x, y, z);
        if !pos.in_bounds() {
            return false;
        }
        self.blocks.insert(pos, block) != Some(block)
    }

    /// Stores `block` only if the cell is empty. Used by generation stages
    /// that must not overwrite earlier ones.
    pub fn set_if_empty(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> bool {
        if self.block_at(x, y, z).is_some() {
            return false;
        }
        self.set_block(x, y, z, block)
    }

    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.blocks.remove(&BlockPos::new(x, y, z)).is_some()
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockType> {
        self.blocks.get(&BlockPos::new(x, y, z)).copied()
    }

    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        if y < WORLD_MIN_Y {
            return true;
        }
        self.block_at(x, y, z).is_some_and(BlockType::is_solid)
    }

    pub fn is_water(&self, x: i32, y: i32, z: i32) -> bool {
        self.block_at(x, y, z) == Some(BlockType::Water)
    }

    /// Lowest non-solid y above the solid column that starts at the floor.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let mut y = WORLD_MIN_Y;
        while y < WORLD_MAX_Y && self.is_solid(x, y, z) {
            y += 1;
        }
        y
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every stored block, for the initial world download.
    pub fn records(&self) -> Vec<BlockRecord> {
        self.blocks
            .iter()
            .map(|(pos, block)| BlockRecord {
                x: pos.x,
                y: pos.y,
                z: pos.z,
                block: *block,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_same_block_twice_reports_unchanged() {
        let mut store = BlockStore::new();
        assert!(store.set_block(1, 2, 3, BlockType::Stone));
        assert!(!store.set_block(1, 2, 3, BlockType::Stone));
        assert!(store.set_block(1, 2, 3, BlockType::Wood));
        assert_eq!(store.block_at(1, 2, 3), Some(BlockType::Wood));
    }

    #[test]
    fn test_remove_absent_block() {
        let mut store = BlockStore::new();
        assert!(!store.remove_block(0, 0, 0));
        store.set_block(0, 0, 0, BlockType::Dirt);
        assert!(store.remove_block(0, 0, 0));
        assert!(!store.is_solid(0, 0, 0));
    }

    #[test]
    fn test_negative_y_rejected_but_solid() {
        let mut store = BlockStore::new();
        assert!(!store.set_block(0, -1, 0, BlockType::Stone));
        assert!(store.is_empty());
        assert!(store.is_solid(0, -1, 0));
        assert!(store.is_solid(50, -20, -7));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut store = BlockStore::new();
        assert!(!store.set_block(0, WORLD_MAX_Y, 0, BlockType::Stone));
        assert!(!store.set_block(WORLD_HORIZONTAL_LIMIT, 0, 0, BlockType::Stone));
        assert!(store.set_block(-WORLD_HORIZONTAL_LIMIT, 0, 0, BlockType::Stone));
    }

    #[test]
    fn test_water_is_not_solid() {
        let mut store = BlockStore::new();
        store.set_block(2, 0, 2, BlockType::Water);
        assert!(!store.is_solid(2, 0, 2));
        assert!(store.is_water(2, 0, 2));
    }

    #[test]
    fn test_surface_height_contiguous_stack() {
        let mut store = BlockStore::new();
        assert_eq!(store.surface_height(0, 0), 0);

        store.set_block(0, 0, 0, BlockType::Stone);
        store.set_block(0, 1, 0, BlockType::Stone);
        // Floating block above a gap does not count.
        store.set_block(0, 3, 0, BlockType::Stone);
        assert_eq!(store.surface_height(0, 0), 2);

        store.set_block(5, 0, 5, BlockType::Water);
        assert_eq!(store.surface_height(5, 5), 0);
    }

    #[test]
    fn test_records_cover_every_block() {
        let mut store = BlockStore::new();
        store.set_block(1, 0, 1, BlockType::Road);
        store.set_block(2, 0, 1, BlockType::Water);
        let mut records = store.records();
        records.sort_by_key(|r| r.x);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].block, BlockType::Road);
        assert_eq!(records[1].block, BlockType::Water);
    }
}
