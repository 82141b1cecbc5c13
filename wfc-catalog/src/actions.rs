//! Transform actions used to derive rotated and mirrored block variants.

use crate::direction::{Direction, DIRECTION_COUNT};
use crate::fill::transform_fill;
use serde::{Deserialize, Serialize};

/// A primitive transform applied to a block (or a whole big block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// 90° rotation about +Y, taking +X onto +Z.
    RotateY,
    /// Mirror across the YZ plane (swaps Left/Right).
    MirrorX,
    /// Mirror across the XY plane (swaps Back/Forward).
    MirrorZ,
    /// Upside-down flip (swaps Down/Up).
    FlipY,
}

impl Action {
    /// Stable byte code, part of a block's identity hash.
    pub const fn code(self) -> u8 {
        match self {
            Action::RotateY => 1,
            Action::MirrorX => 2,
            Action::MirrorZ => 3,
            Action::FlipY => 4,
        }
    }

    /// Where a face ends up after the transform.
    pub const fn map_direction(self, direction: Direction) -> Direction {
        match (self, direction) {
            (Action::RotateY, Direction::Left) => Direction::Back,
            (Action::RotateY, Direction::Back) => Direction::Right,
            (Action::RotateY, Direction::Right) => Direction::Forward,
            (Action::RotateY, Direction::Forward) => Direction::Left,
            (Action::MirrorX, Direction::Left) => Direction::Right,
            (Action::MirrorX, Direction::Right) => Direction::Left,
            (Action::MirrorZ, Direction::Back) => Direction::Forward,
            (Action::MirrorZ, Direction::Forward) => Direction::Back,
            (Action::FlipY, Direction::Down) => Direction::Up,
            (Action::FlipY, Direction::Up) => Direction::Down,
            (_, d) => d,
        }
    }

    /// Maps a cell position inside a box of `size` cells onto the transformed box.
    ///
    /// Returns the new position together with the transformed box size.
    pub fn map_cell(self, pos: [usize; 3], size: [usize; 3]) -> ([usize; 3], [usize; 3]) {
        let [x, y, z] = pos;
        let [sx, sy, sz] = size;
        match self {
            // (x, y, z) -> (sz - 1 - z, y, x); the box swaps its X and Z extents.
            Action::RotateY => ([sz - 1 - z, y, x], [sz, sy, sx]),
            Action::MirrorX => ([sx - 1 - x, y, z], size),
            Action::MirrorZ => ([x, y, sz - 1 - z], size),
            Action::FlipY => ([x, sy - 1 - y, z], size),
        }
    }
}

/// Permutes per-face values (connection ids) according to a single action.
pub fn transform_faces<T: Copy>(faces: [T; DIRECTION_COUNT], action: Action) -> [T; DIRECTION_COUNT] {
    let mut out = faces;
    for d in Direction::ALL {
        out[action.map_direction(d).index()] = faces[d.index()];
    }
    out
}

/// Applies a sequence of actions to a fill code and its base connections.
pub fn apply_actions(
    fill: u8,
    connections: [u32; DIRECTION_COUNT],
    actions: &[Action],
) -> (u8, [u32; DIRECTION_COUNT]) {
    actions
        .iter()
        .fold((fill, connections), |(fill, connections), &action| {
            (transform_fill(fill, action), transform_faces(connections, action))
        })
}

/// A named set of variants generated from one authored block.
///
/// Every group yields the identity variant first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionGroup {
    /// Only the authored orientation.
    #[default]
    None,
    /// Four rotations about Y.
    Rotate4,
    /// Authored plus its X mirror.
    MirrorX,
    /// Four rotations, each with and without an X mirror.
    Rotate4Mirror,
    /// Authored plus its upside-down flip.
    FlipY,
    /// Explicit list of action sequences.
    Custom(Vec<Vec<Action>>),
}

impl ActionGroup {
    /// Expands the group into the action sequence of each variant.
    pub fn variants(&self) -> Vec<Vec<Action>> {
        use Action::{FlipY, MirrorX, RotateY};
        let rotations = || {
            vec![
                vec![],
                vec![RotateY],
                vec![RotateY, RotateY],
                vec![RotateY, RotateY, RotateY],
            ]
        };
        match self {
            ActionGroup::None => vec![vec![]],
            ActionGroup::Rotate4 => rotations(),
            ActionGroup::MirrorX => vec![vec![], vec![MirrorX]],
            ActionGroup::Rotate4Mirror => {
                let mut variants = rotations();
                let mirrored: Vec<Vec<Action>> = rotations()
                    .into_iter()
                    .map(|mut seq| {
                        seq.push(MirrorX);
                        seq
                    })
                    .collect();
                variants.extend(mirrored);
                variants
            }
            ActionGroup::FlipY => vec![vec![], vec![FlipY]],
            ActionGroup::Custom(sequences) => {
                let mut variants = vec![vec![]];
                for seq in sequences {
                    if !variants.contains(seq) {
                        variants.push(seq.clone());
                    }
                }
                variants
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_four_times_is_identity() {
        let faces = [1u32, 2, 3, 4, 5, 6];
        let mut rotated = faces;
        for _ in 0..4 {
            rotated = transform_faces(rotated, Action::RotateY);
        }
        assert_eq!(rotated, faces);
    }

    #[test]
    fn rotate_moves_right_face_forward() {
        let mut faces = [0u32; 6];
        faces[Direction::Right.index()] = 7;
        let rotated = transform_faces(faces, Action::RotateY);
        assert_eq!(rotated[Direction::Forward.index()], 7);
        assert_eq!(rotated[Direction::Right.index()], 0);
    }

    #[test]
    fn mirrors_swap_opposite_faces() {
        let faces = [1u32, 2, 3, 4, 5, 6];
        let mx = transform_faces(faces, Action::MirrorX);
        assert_eq!(mx[Direction::Left.index()], 4);
        assert_eq!(mx[Direction::Right.index()], 1);
        let fy = transform_faces(faces, Action::FlipY);
        assert_eq!(fy[Direction::Down.index()], 5);
        assert_eq!(fy[Direction::Up.index()], 2);
    }

    #[test]
    fn map_cell_rotates_box_extents() {
        let (pos, size) = Action::RotateY.map_cell([1, 0, 0], [2, 1, 3]);
        assert_eq!(size, [3, 1, 2]);
        assert_eq!(pos, [2, 0, 1]);
    }

    #[test]
    fn variants_start_with_identity() {
        for group in [
            ActionGroup::None,
            ActionGroup::Rotate4,
            ActionGroup::MirrorX,
            ActionGroup::Rotate4Mirror,
            ActionGroup::FlipY,
            ActionGroup::Custom(vec![vec![Action::MirrorZ]]),
        ] {
            let variants = group.variants();
            assert!(variants[0].is_empty(), "{group:?}");
        }
        assert_eq!(ActionGroup::Rotate4Mirror.variants().len(), 8);
    }
}
