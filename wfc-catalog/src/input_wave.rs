use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of groups an [`InputWaveCell`] can address.
pub const MAX_GROUPS: usize = 32;

/// Per-cell bitmask of the groups allowed before solving starts.
///
/// Bit `i` set means blocks of group `i` are allowed in the cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputWaveCell(u32);

impl InputWaveCell {
    /// Every group allowed.
    pub const ALL_GROUPS: InputWaveCell = InputWaveCell(u32::MAX);
    /// No group allowed. A cell with this mask can never be solved.
    pub const NONE: InputWaveCell = InputWaveCell(0);

    /// Wraps a raw mask.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask allowing exactly one group. Groups past [`MAX_GROUPS`] are ignored.
    pub fn single(group: usize) -> Self {
        let mut cell = Self::NONE;
        cell.set(group, true);
        cell
    }

    /// Mask allowing each of the given groups.
    pub fn from_groups<I: IntoIterator<Item = usize>>(groups: I) -> Self {
        let mut cell = Self::NONE;
        for group in groups {
            cell.set(group, true);
        }
        cell
    }

    /// The raw mask.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether `group` is allowed.
    #[inline]
    pub fn get(self, group: usize) -> bool {
        group < MAX_GROUPS && self.0 & (1 << group) != 0
    }

    /// Allows or forbids `group`.
    pub fn set(&mut self, group: usize, allowed: bool) {
        if group >= MAX_GROUPS {
            log::warn!("Ignoring group index {group} beyond the {MAX_GROUPS}-group input wave limit");
            return;
        }
        if allowed {
            self.0 |= 1 << group;
        } else {
            self.0 &= !(1 << group);
        }
    }

    /// True when every bit is set.
    pub const fn contains_all(self) -> bool {
        self.0 == u32::MAX
    }

    /// True when no group is allowed.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Groups allowed by both masks.
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Groups allowed by either mask.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Allowed group indices below `group_count`, ascending.
    pub fn groups(self, group_count: usize) -> impl Iterator<Item = usize> {
        (0..group_count.min(MAX_GROUPS)).filter(move |&g| self.get(g))
    }
}

impl Default for InputWaveCell {
    fn default() -> Self {
        Self::ALL_GROUPS
    }
}

impl fmt::Debug for InputWaveCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains_all() {
            write!(f, "InputWaveCell(all)")
        } else {
            write!(f, "InputWaveCell({:#034b})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn all_groups_contains_all() {
        assert!(InputWaveCell::ALL_GROUPS.contains_all());
        assert!(InputWaveCell::default().contains_all());
        assert!(!InputWaveCell::single(3).contains_all());
    }

    #[test]
    fn clearing_last_bit_leaves_unsolvable_cell() {
        let mut cell = InputWaveCell::single(2);
        cell.set(2, false);
        assert!(cell.is_empty());
    }

    #[test]
    fn out_of_range_groups_are_ignored() {
        let mut cell = InputWaveCell::NONE;
        cell.set(MAX_GROUPS, true);
        assert!(cell.is_empty());
        assert!(!cell.get(40));
    }

    #[test]
    fn groups_iterates_allowed_only() {
        let cell = InputWaveCell::from_groups([0, 2, 5]);
        assert_eq!(cell.groups(4).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(cell.groups(8).collect::<Vec<_>>(), vec![0, 2, 5]);
    }

    proptest! {
        #[test]
        fn set_then_get_round_trips(bits in any::<u32>(), group in 0usize..MAX_GROUPS, value in any::<bool>()) {
            let mut cell = InputWaveCell::from_bits(bits);
            cell.set(group, value);
            prop_assert_eq!(cell.get(group), value);
            for other in (0..MAX_GROUPS).filter(|&g| g != group) {
                prop_assert_eq!(cell.get(other), bits & (1 << other) != 0);
            }
        }
    }
}
