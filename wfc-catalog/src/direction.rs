use serde::{Deserialize, Serialize};

/// One of the six axis-aligned faces of a grid cell.
///
/// The discriminants are stable and used as array indices throughout the
/// catalog and solver: negative axes first, then positive axes, so that
/// `opposite(d) == (d + 3) % 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// -X
    Left = 0,
    /// -Y
    Down = 1,
    /// -Z
    Back = 2,
    /// +X
    Right = 3,
    /// +Y
    Up = 4,
    /// +Z
    Forward = 5,
}

/// Number of face directions of a cell.
pub const DIRECTION_COUNT: usize = 6;

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; DIRECTION_COUNT] = [
        Direction::Left,
        Direction::Down,
        Direction::Back,
        Direction::Right,
        Direction::Up,
        Direction::Forward,
    ];

    /// Index of this direction in `0..6`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction for an index in `0..6`. Returns `None` for anything else.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Direction::Left),
            1 => Some(Direction::Down),
            2 => Some(Direction::Back),
            3 => Some(Direction::Right),
            4 => Some(Direction::Up),
            5 => Some(Direction::Forward),
            _ => None,
        }
    }

    /// The direction pointing the other way along the same axis.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Back => Direction::Forward,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Forward => Direction::Back,
        }
    }

    /// Unit offset `(dx, dy, dz)` of the neighbor across this face.
    #[inline]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Left => (-1, 0, 0),
            Direction::Down => (0, -1, 0),
            Direction::Back => (0, 0, -1),
            Direction::Right => (1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Forward => (0, 0, 1),
        }
    }

    /// Axis of this direction: 0 = X, 1 = Y, 2 = Z.
    #[inline]
    pub const fn axis(self) -> usize {
        self.index() % 3
    }

    /// True for `Right`, `Up` and `Forward`.
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.index() >= 3
    }
}

/// Opposite of a raw direction index.
#[inline]
pub const fn opposite_index(direction: usize) -> usize {
    (direction + 3) % DIRECTION_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_matches_index_rule() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().index(), opposite_index(d.index()));
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn offsets_cancel_out() {
        for d in Direction::ALL {
            let (x, y, z) = d.offset();
            let (ox, oy, oz) = d.opposite().offset();
            assert_eq!((x + ox, y + oy, z + oz), (0, 0, 0));
        }
    }

    #[test]
    fn from_index_round_trip() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(6), None);
    }
}
