//! World-space bounds, persistent level data and input waves.

use crate::grid::Grid;
use nalgebra::Vector3;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use wfc_catalog::{BlockHash, InputWaveCell, UNSET_HASH};

/// Axis-aligned box of cells in world coordinates; `min` inclusive, `min + size` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: Vector3<i32>,
    pub size: Vector3<i32>,
}

impl Bounds {
    pub fn new(min: Vector3<i32>, size: Vector3<i32>) -> Self {
        Self { min, size }
    }

    /// Bounds at the origin with the given size.
    pub fn from_size(x: i32, y: i32, z: i32) -> Self {
        Self::new(Vector3::zeros(), Vector3::new(x, y, z))
    }

    /// Exclusive upper corner.
    pub fn max(&self) -> Vector3<i32> {
        self.min + self.size
    }

    /// Number of cells; zero when any extent is zero or negative.
    pub fn volume(&self) -> usize {
        if self.size.iter().any(|&s| s <= 0) {
            return 0;
        }
        self.size.iter().map(|&s| s as usize).product()
    }

    pub fn contains(&self, position: Vector3<i32>) -> bool {
        let max = self.max();
        (0..3).all(|axis| position[axis] >= self.min[axis] && position[axis] < max[axis])
    }

    /// Whether `other` lies entirely inside these bounds.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        let max = self.max();
        let other_max = other.max();
        (0..3).all(|axis| other.min[axis] >= self.min[axis] && other_max[axis] <= max[axis])
    }

    /// `size` as unsigned extents; negative extents clamp to zero.
    pub fn dimensions(&self) -> [usize; 3] {
        [0, 1, 2].map(|axis| usize::try_from(self.size[axis]).unwrap_or(0))
    }

    /// Every position inside the bounds, x fastest.
    pub fn positions(&self) -> impl Iterator<Item = Vector3<i32>> + '_ {
        let max = self.max();
        (self.min.z..max.z).flat_map(move |z| {
            (self.min.y..max.y).flat_map(move |y| (self.min.x..max.x).map(move |x| Vector3::new(x, y, z)))
        })
    }
}

/// Resolved block hashes of one region, anchored in world space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelData {
    bounds: Bounds,
    blocks: Grid<BlockHash>,
}

/// Level data shared between a solver, its neighbours' boundaries and the caller.
pub type SharedLevel = Arc<RwLock<LevelData>>;

/// A priori group masks, one per cell of a level.
pub type InputWave = Grid<InputWaveCell>;
/// Input wave shared between solvers and boundaries.
pub type SharedInputWave = Arc<InputWave>;

impl LevelData {
    /// Empty (all unset) level covering `bounds`.
    pub fn new(bounds: Bounds) -> Self {
        let [w, h, d] = bounds.dimensions();
        Self {
            bounds,
            blocks: Grid::filled(w, h, d, UNSET_HASH),
        }
    }

    /// Wraps the level into a [`SharedLevel`].
    pub fn shared(self) -> SharedLevel {
        Arc::new(RwLock::new(self))
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Lowest world `y` of the level.
    pub fn base_layer(&self) -> i32 {
        self.bounds.min.y
    }

    pub fn contains(&self, world: Vector3<i32>) -> bool {
        self.bounds.contains(world)
    }

    /// Hash at a world position; `None` outside the level.
    pub fn get(&self, world: Vector3<i32>) -> Option<BlockHash> {
        self.blocks.get_local(world - self.bounds.min).copied()
    }

    /// Stores a hash at a world position. Returns false outside the level.
    pub fn set(&mut self, world: Vector3<i32>, hash: BlockHash) -> bool {
        match self.blocks.get_local_mut(world - self.bounds.min) {
            Some(cell) => {
                *cell = hash;
                true
            }
            None => false,
        }
    }

    /// Dense hash grid in level-local coordinates.
    pub fn blocks(&self) -> &Grid<BlockHash> {
        &self.blocks
    }

    /// Resets every cell to unset.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Number of cells holding a block.
    pub fn resolved_count(&self) -> usize {
        self.blocks.as_slice().iter().filter(|&&h| h != UNSET_HASH).count()
    }
}

/// Input wave covering `bounds`, every cell allowing all groups.
pub fn input_wave_for(bounds: &Bounds) -> InputWave {
    let [w, h, d] = bounds.dimensions();
    Grid::new(w, h, d)
}

/// Shared read access that survives a writer panicking elsewhere.
pub fn read_level(level: &SharedLevel) -> RwLockReadGuard<'_, LevelData> {
    level.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write access that survives a poisoned lock.
pub fn write_level(level: &SharedLevel) -> RwLockWriteGuard<'_, LevelData> {
    level.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_contain_and_volume() {
        let bounds = Bounds::new(Vector3::new(-2, 0, 5), Vector3::new(4, 2, 1));
        assert_eq!(bounds.volume(), 8);
        assert!(bounds.contains(Vector3::new(-2, 1, 5)));
        assert!(!bounds.contains(Vector3::new(2, 0, 5)));
        assert!(bounds.contains_bounds(&Bounds::new(Vector3::new(0, 0, 5), Vector3::new(2, 2, 1))));
        assert!(!bounds.contains_bounds(&Bounds::new(Vector3::new(0, 0, 5), Vector3::new(3, 1, 1))));
        assert_eq!(Bounds::from_size(0, 3, 3).volume(), 0);
    }

    #[test]
    fn positions_follow_grid_order() {
        let bounds = Bounds::new(Vector3::new(1, 1, 1), Vector3::new(2, 1, 2));
        let positions: Vec<_> = bounds.positions().collect();
        assert_eq!(positions.len(), 4);
        assert_eq!(positions[1], Vector3::new(2, 1, 1));
        assert_eq!(positions[2], Vector3::new(1, 1, 2));
    }

    #[test]
    fn level_uses_world_coordinates() {
        let mut level = LevelData::new(Bounds::new(Vector3::new(10, -1, 0), Vector3::new(2, 2, 2)));
        assert_eq!(level.base_layer(), -1);
        assert!(level.set(Vector3::new(11, 0, 1), 42));
        assert!(!level.set(Vector3::new(0, 0, 0), 42));
        assert_eq!(level.get(Vector3::new(11, 0, 1)), Some(42));
        assert_eq!(level.get(Vector3::new(10, -1, 0)), Some(UNSET_HASH));
        assert_eq!(level.resolved_count(), 1);
        level.clear();
        assert_eq!(level.resolved_count(), 0);
    }
}
