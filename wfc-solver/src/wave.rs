//! Per-cell candidate sets and support counters of one solve attempt.

use bitvec::prelude::*;
use wfc_catalog::{BlockWeights, Catalog, Direction, DIRECTION_COUNT};

/// Removal of `block` from the candidates of `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ban {
    pub cell: usize,
    pub block: usize,
}

/// Candidates of one cell.
///
/// `support[a][d]` counts the blocks still possible in the neighbour across
/// `d` that connect to candidate `a`; the candidate is banned when any
/// counter reaches zero.
#[derive(Debug, Clone, Default)]
pub struct CellWave {
    alive: BitVec,
    support: Vec<[u32; DIRECTION_COUNT]>,
    remaining: usize,
    /// Candidates with a positive weight.
    weighted: usize,
    weight_sum: f64,
}

impl CellWave {
    /// Clears the cell and sizes it for `block_count` candidates.
    pub(crate) fn reset(&mut self, block_count: usize) {
        self.alive.clear();
        self.alive.resize(block_count, false);
        self.support.clear();
        self.support.resize(block_count, [0; DIRECTION_COUNT]);
        self.remaining = 0;
        self.weighted = 0;
        self.weight_sum = 0.0;
    }

    /// Adds a candidate during Fill.
    pub(crate) fn admit(&mut self, block: usize, support: [u32; DIRECTION_COUNT], weight: f32) {
        if self.alive.replace(block, true) {
            return;
        }
        self.support[block] = support;
        self.remaining += 1;
        if weight > 0.0 {
            self.weighted += 1;
        }
        self.weight_sum += f64::from(weight);
    }

    /// Removes a candidate. Returns false if it was already gone.
    pub fn ban(&mut self, block: usize, weight: f32) -> bool {
        if !self.alive.replace(block, false) {
            return false;
        }
        self.remaining -= 1;
        if weight > 0.0 {
            self.weighted -= 1;
        }
        self.weight_sum = if self.weighted == 0 {
            0.0
        } else {
            (self.weight_sum - f64::from(weight)).max(0.0)
        };
        true
    }

    #[inline]
    pub fn is_alive(&self, block: usize) -> bool {
        self.alive.get(block).is_some_and(|bit| *bit)
    }

    /// Remaining candidate count.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Remaining candidates with a positive weight.
    #[inline]
    pub fn weighted_remaining(&self) -> usize {
        self.weighted
    }

    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }

    /// Support of candidate `block` across `direction`.
    pub fn support(&self, block: usize, direction: Direction) -> u32 {
        self.support[block][direction.index()]
    }

    pub fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive.iter_ones()
    }

    /// The single remaining candidate, if resolved.
    pub fn resolved(&self) -> Option<usize> {
        if self.remaining == 1 {
            self.alive.first_one()
        } else {
            None
        }
    }

    /// Withdraws the support a banned neighbour block gave to this cell.
    ///
    /// The banned block sat across `from` (seen from this cell). Candidates
    /// whose counter drops to zero are banned and reported in `out`. Returns
    /// true if this cell ran out of candidates.
    pub(crate) fn retract(
        &mut self,
        cell: usize,
        from: Direction,
        banned: usize,
        catalog: &Catalog,
        weights: &BlockWeights,
        out: &mut Vec<Ban>,
    ) -> bool {
        let slot = from.index();
        // Blocks that may sit across `from.opposite()` of `banned` are the ones
        // it supported here.
        for &block in catalog.connections(from.opposite(), banned) {
            if !self.is_alive(block) {
                continue;
            }
            let counter = &mut self.support[block][slot];
            *counter = counter.saturating_sub(1);
            if *counter == 0 && self.ban(block, weights.weight(block)) {
                out.push(Ban { cell, block });
            }
        }
        self.remaining == 0
    }
}

/// Index of the neighbour of `index` across `direction` in a region of `size`
/// cells, `None` when it falls outside.
#[inline]
pub fn neighbour_in(size: [usize; 3], index: usize, direction: Direction) -> Option<usize> {
    let [w, h, _] = size;
    let mut pos = [index % w, (index / w) % h, index / (w * h)];
    let axis = direction.axis();
    if direction.is_positive() {
        pos[axis] += 1;
        if pos[axis] >= size[axis] {
            return None;
        }
    } else {
        pos[axis] = pos[axis].checked_sub(1)?;
    }
    Some(pos[2] * w * h + pos[1] * w + pos[0])
}

/// Candidate state of every cell of the solve volume.
///
/// Cell storage is allocated once for the solver capacity and reused by every
/// attempt; only the first `volume` cells are live.
#[derive(Debug, Clone, Default)]
pub struct Wave {
    pub(crate) cells: Vec<CellWave>,
    size: [usize; 3],
}

impl Wave {
    pub fn with_capacity(capacity: [usize; 3]) -> Self {
        let cells = capacity.iter().product();
        Self {
            cells: vec![CellWave::default(); cells],
            size: [0; 3],
        }
    }

    /// Prepares the wave for a region of `size` cells.
    pub(crate) fn reset(&mut self, size: [usize; 3], block_count: usize) {
        self.size = size;
        let volume = self.volume();
        if self.cells.len() < volume {
            self.cells.resize_with(volume, CellWave::default);
        }
        for cell in &mut self.cells[..volume] {
            cell.reset(block_count);
        }
    }

    /// Region size `[width, height, depth]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn volume(&self) -> usize {
        self.size.iter().product()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.size[0] * self.size[1] + y * self.size[0] + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> [usize; 3] {
        let [w, h, _] = self.size;
        [index % w, (index / w) % h, index / (w * h)]
    }

    /// Index of the neighbour across `direction`, `None` outside the region.
    #[inline]
    pub fn neighbour(&self, index: usize, direction: Direction) -> Option<usize> {
        neighbour_in(self.size, index, direction)
    }

    pub fn cell(&self, index: usize) -> &CellWave {
        &self.cells[index]
    }

    pub(crate) fn cell_mut(&mut self, index: usize) -> &mut CellWave {
        &mut self.cells[index]
    }

    /// Live cells of the current region.
    pub fn cells(&self) -> &[CellWave] {
        &self.cells[..self.volume()]
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellWave] {
        let volume = self.volume();
        &mut self.cells[..volume]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn neighbours_stay_inside_region() {
        let mut wave = Wave::with_capacity([4, 4, 4]);
        wave.reset([3, 2, 1], 2);
        assert_eq!(wave.volume(), 6);
        let corner = wave.index(0, 0, 0);
        assert_eq!(wave.neighbour(corner, Direction::Left), None);
        assert_eq!(wave.neighbour(corner, Direction::Right), Some(1));
        assert_eq!(wave.neighbour(corner, Direction::Up), Some(3));
        assert_eq!(wave.neighbour(corner, Direction::Forward), None);
        assert_eq!(wave.neighbour(wave.index(2, 1, 0), Direction::Right), None);
    }

    #[test]
    fn ban_tracks_counts_and_weights() {
        let mut cell = CellWave::default();
        cell.reset(3);
        cell.admit(0, [1; 6], 1.0);
        cell.admit(1, [1; 6], 0.0);
        cell.admit(2, [1; 6], 2.0);
        assert_eq!(cell.remaining(), 3);
        assert_eq!(cell.weighted_remaining(), 2);
        assert_eq!(cell.weight_sum(), 3.0);

        assert!(cell.ban(2, 2.0));
        assert!(!cell.ban(2, 2.0));
        assert!(cell.ban(0, 1.0));
        assert_eq!(cell.remaining(), 1);
        assert_eq!(cell.weighted_remaining(), 0);
        assert_eq!(cell.weight_sum(), 0.0);
        assert_eq!(cell.resolved(), Some(1));
    }

    proptest! {
        #[test]
        fn neighbour_is_mutual(w in 1usize..6, h in 1usize..6, d in 1usize..6, seed in any::<usize>(), dir in 0usize..6) {
            let size = [w, h, d];
            let index = seed % (w * h * d);
            let direction = Direction::ALL[dir];
            if let Some(other) = neighbour_in(size, index, direction) {
                prop_assert!(other < w * h * d);
                prop_assert_eq!(neighbour_in(size, other, direction.opposite()), Some(index));
            }
        }
    }
}
