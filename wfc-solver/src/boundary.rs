//! Constraints applied at the faces of a level.
//!
//! A [`Boundary`] is evaluated per world position just outside the level and
//! yields either nothing, a concrete block or a group mask.

use crate::level::{read_level, SharedInputWave, SharedLevel};
use nalgebra::Vector3;
use wfc_catalog::{BlockHash, InputWaveCell, UNSET_HASH};

/// What a boundary requires of the cell it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryConstraint {
    /// Unconstrained.
    None,
    /// The neighbour is this block.
    Block(BlockHash),
    /// The neighbour is some block of these groups.
    Groups(InputWaveCell),
}

/// Constant group mask, optionally limited to the base layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupsBoundary {
    pub mask: InputWaveCell,
    /// When set, only positions at or below this world `y` are constrained.
    pub base_layer: Option<i32>,
}

/// Delegates to a neighbouring region's resolved data.
#[derive(Debug, Clone)]
pub struct LevelBoundary {
    pub level: SharedLevel,
    pub input_wave: Option<SharedInputWave>,
    /// Only the neighbour's lowest layer constrains; everything above falls through.
    pub base_layer_only: bool,
    /// Evaluated where the neighbour level does not apply.
    pub fallback: Option<Box<Boundary>>,
}

#[derive(Debug, Clone)]
pub enum Boundary {
    Groups(GroupsBoundary),
    Block(BlockHash),
    Level(LevelBoundary),
}

impl Boundary {
    /// Group mask boundary active everywhere.
    pub fn groups(mask: InputWaveCell) -> Self {
        Boundary::Groups(GroupsBoundary {
            mask,
            base_layer: None,
        })
    }

    /// Boundary backed by another level, without fallback.
    pub fn level(level: SharedLevel, input_wave: Option<SharedInputWave>) -> Self {
        Boundary::Level(LevelBoundary {
            level,
            input_wave,
            base_layer_only: false,
            fallback: None,
        })
    }

    /// Constraint on the cell at world position `world`.
    pub fn evaluate(&self, world: Vector3<i32>) -> BoundaryConstraint {
        match self {
            Boundary::Groups(groups) => match groups.base_layer {
                Some(base) if world.y > base => BoundaryConstraint::None,
                _ => BoundaryConstraint::Groups(groups.mask),
            },
            Boundary::Block(hash) => BoundaryConstraint::Block(*hash),
            Boundary::Level(level) => level.evaluate(world),
        }
    }
}

impl LevelBoundary {
    pub fn evaluate(&self, world: Vector3<i32>) -> BoundaryConstraint {
        let resolved = {
            let level = read_level(&self.level);
            let in_layer = !self.base_layer_only || world.y == level.base_layer();
            match level.get(world) {
                Some(hash) if in_layer => Some((hash, world - level.bounds().min)),
                _ => None,
            }
        };
        match resolved {
            Some((hash, _)) if hash != UNSET_HASH => BoundaryConstraint::Block(hash),
            Some((_, local)) => {
                let mask = self
                    .input_wave
                    .as_ref()
                    .and_then(|wave| wave.get_local(local).copied())
                    .unwrap_or(InputWaveCell::ALL_GROUPS);
                BoundaryConstraint::Groups(mask)
            }
            None => self
                .fallback
                .as_ref()
                .map_or(BoundaryConstraint::None, |fallback| fallback.evaluate(world)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{input_wave_for, Bounds, LevelData};
    use std::sync::Arc;

    fn neighbour() -> SharedLevel {
        let mut level = LevelData::new(Bounds::new(Vector3::new(0, 0, 0), Vector3::new(2, 2, 1)));
        level.set(Vector3::new(0, 0, 0), 77);
        level.shared()
    }

    #[test]
    fn groups_boundary_respects_base_layer() {
        let boundary = Boundary::Groups(GroupsBoundary {
            mask: InputWaveCell::single(1),
            base_layer: Some(0),
        });
        assert_eq!(
            boundary.evaluate(Vector3::new(5, -1, 0)),
            BoundaryConstraint::Groups(InputWaveCell::single(1))
        );
        assert_eq!(boundary.evaluate(Vector3::new(5, 1, 0)), BoundaryConstraint::None);
    }

    #[test]
    fn level_boundary_reads_hash_then_input_wave() {
        let level = neighbour();
        let bounds = *read_level(&level).bounds();
        let mut wave = input_wave_for(&bounds);
        *wave.get_mut(1, 0, 0).unwrap() = InputWaveCell::single(3);
        let boundary = Boundary::level(level, Some(Arc::new(wave)));

        assert_eq!(boundary.evaluate(Vector3::new(0, 0, 0)), BoundaryConstraint::Block(77));
        assert_eq!(
            boundary.evaluate(Vector3::new(1, 0, 0)),
            BoundaryConstraint::Groups(InputWaveCell::single(3))
        );
        assert_eq!(
            boundary.evaluate(Vector3::new(0, 1, 0)),
            BoundaryConstraint::Groups(InputWaveCell::ALL_GROUPS)
        );
        assert_eq!(boundary.evaluate(Vector3::new(9, 0, 0)), BoundaryConstraint::None);
    }

    #[test]
    fn level_boundary_falls_back_above_base_layer() {
        let boundary = Boundary::Level(LevelBoundary {
            level: neighbour(),
            input_wave: None,
            base_layer_only: true,
            fallback: Some(Box::new(Boundary::Block(5))),
        });
        assert_eq!(boundary.evaluate(Vector3::new(0, 0, 0)), BoundaryConstraint::Block(77));
        assert_eq!(boundary.evaluate(Vector3::new(0, 1, 0)), BoundaryConstraint::Block(5));
        assert_eq!(boundary.evaluate(Vector3::new(-4, 0, 0)), BoundaryConstraint::Block(5));
    }
}
