use crate::direction::{Direction, DIRECTION_COUNT};
use crate::fill::{composite_ids, EMPTY_FILL, SOLID_FILL};
use crate::input_wave::InputWaveCell;
use crate::types::{
    Block, BlockHash, BlockResources, GroupId, BUILTIN_GROUPS, DEFAULT_WEIGHT_GROUP,
    DEFAULT_WEIGHT_GROUP_NAME, EMPTY_GROUP, EMPTY_HASH, SOLID_GROUP, SOLID_HASH,
};
use crate::weights::BlockWeights;
use log::{debug, info};
use std::collections::HashMap;
use std::ops::Range;

/// The compiled, read-only block repository the solver consumes.
///
/// Blocks are sorted by group so every group is a contiguous index range;
/// Empty and Solid always sit at indices 0 and 1. Per direction the catalog
/// stores, for every block, the sorted list of blocks that may sit next to it,
/// and the group adjacency counter: how many blocks of each group connect to a
/// given block in a given direction.
#[derive(Debug, Clone)]
pub struct Catalog {
    blocks: Vec<Block>,
    resources: Vec<BlockResources>,
    hash_to_index: HashMap<BlockHash, usize>,
    group_names: Vec<String>,
    group_starts: Vec<usize>,
    weight_group_names: Vec<String>,
    layer_count: usize,
    /// `connections[d][a]`: blocks `b` with `a.connections[d] == b.connections[opposite(d)]`.
    connections: [Vec<Vec<usize>>; DIRECTION_COUNT],
    /// Flattened `[direction][block][group]` neighbour counts.
    group_adjacency: Vec<u32>,
}

impl Catalog {
    /// Catalog containing only the built-in Empty and Solid blocks.
    pub fn builtin() -> Self {
        Self::from_parts(
            Vec::new(),
            Vec::new(),
            BUILTIN_GROUPS.iter().map(|s| (*s).to_owned()).collect(),
            vec![DEFAULT_WEIGHT_GROUP_NAME.to_owned()],
            0,
        )
    }

    /// The built-in Empty and Solid blocks, in index order.
    pub(crate) fn builtin_blocks() -> [(Block, BlockResources); 2] {
        let builtin = |name: &str, hash, group, fill| {
            (
                Block {
                    name: name.to_owned(),
                    hash,
                    group,
                    weight_group: DEFAULT_WEIGHT_GROUP,
                    weight: 1.0,
                    fill,
                    connections: composite_ids([0; DIRECTION_COUNT], fill),
                    layer: 0,
                    actions: Vec::new(),
                    big_block: None,
                },
                BlockResources::default(),
            )
        };
        [
            builtin("Empty", EMPTY_HASH, EMPTY_GROUP, EMPTY_FILL),
            builtin("Solid", SOLID_HASH, SOLID_GROUP, SOLID_FILL),
        ]
    }

    /// Assembles a catalog from expanded authored blocks. Built-ins are
    /// prepended, blocks are stably sorted by group and all lookup tables are
    /// derived.
    pub(crate) fn from_parts(
        authored: Vec<Block>,
        authored_resources: Vec<BlockResources>,
        group_names: Vec<String>,
        weight_group_names: Vec<String>,
        layer_count: usize,
    ) -> Self {
        let mut entries: Vec<(Block, BlockResources)> = Self::builtin_blocks().into();
        entries.extend(authored.into_iter().zip(authored_resources));
        // Stable: built-ins stay first within their groups.
        entries.sort_by_key(|(block, _)| block.group);

        let (blocks, resources): (Vec<Block>, Vec<BlockResources>) = entries.into_iter().unzip();
        let group_count = group_names.len();

        let mut group_starts = vec![0usize; group_count + 1];
        for block in &blocks {
            group_starts[block.group + 1] += 1;
        }
        for g in 0..group_count {
            group_starts[g + 1] += group_starts[g];
        }

        let hash_to_index = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.hash, index))
            .collect();

        let connections = Self::build_connections(&blocks);
        let group_adjacency = Self::build_group_adjacency(&blocks, &connections, group_count);

        info!(
            "Catalog ready: {} blocks, {} groups, {} weight groups, {} layers",
            blocks.len(),
            group_count,
            weight_group_names.len(),
            layer_count
        );

        Self {
            blocks,
            resources,
            hash_to_index,
            group_names,
            group_starts,
            weight_group_names,
            layer_count,
            connections,
            group_adjacency,
        }
    }

    fn build_connections(blocks: &[Block]) -> [Vec<Vec<usize>>; DIRECTION_COUNT] {
        std::array::from_fn(|d| {
            let direction = Direction::ALL[d];
            let opposite = direction.opposite().index();
            // Blocks keyed by the id they expose on the face that looks back at us.
            let mut by_id: HashMap<u32, Vec<usize>> = HashMap::new();
            for (index, block) in blocks.iter().enumerate() {
                by_id.entry(block.connections[opposite]).or_default().push(index);
            }
            let lists: Vec<Vec<usize>> = blocks
                .iter()
                .map(|block| by_id.get(&block.connections[d]).cloned().unwrap_or_default())
                .collect();
            debug!(
                "Direction {:?}: {} adjacency pairs",
                direction,
                lists.iter().map(Vec::len).sum::<usize>()
            );
            lists
        })
    }

    fn build_group_adjacency(
        blocks: &[Block],
        connections: &[Vec<Vec<usize>>; DIRECTION_COUNT],
        group_count: usize,
    ) -> Vec<u32> {
        let block_count = blocks.len();
        let mut counts = vec![0u32; DIRECTION_COUNT * block_count * group_count];
        for (d, lists) in connections.iter().enumerate() {
            for (a, neighbours) in lists.iter().enumerate() {
                let row = (d * block_count + a) * group_count;
                for &b in neighbours {
                    counts[row + blocks[b].group] += 1;
                }
            }
        }
        counts
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the built-ins are present in every catalog.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Index of the block with the given hash.
    pub fn get_block_index(&self, hash: BlockHash) -> Option<usize> {
        self.hash_to_index.get(&hash).copied()
    }

    pub fn hash_of(&self, index: usize) -> BlockHash {
        self.blocks[index].hash
    }

    pub fn group_of(&self, index: usize) -> GroupId {
        self.blocks[index].group
    }

    /// Contiguous index range of a group's blocks. Empty for unknown groups.
    pub fn group_range(&self, group: GroupId) -> Range<usize> {
        if group + 1 >= self.group_starts.len() {
            return 0..0;
        }
        self.group_starts[group]..self.group_starts[group + 1]
    }

    pub fn group_count(&self) -> usize {
        self.group_names.len()
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn group_index(&self, name: &str) -> Option<GroupId> {
        self.group_names.iter().position(|g| g == name)
    }

    /// Mask with a bit for every group this catalog defines.
    pub fn all_groups_mask(&self) -> InputWaveCell {
        InputWaveCell::from_groups(0..self.group_count())
    }

    pub fn weight_group_count(&self) -> usize {
        self.weight_group_names.len()
    }

    pub fn weight_group_names(&self) -> &[String] {
        &self.weight_group_names
    }

    pub fn weight_group_index(&self, name: &str) -> Option<usize> {
        self.weight_group_names.iter().position(|g| g == name)
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Sorted indices of the blocks that may sit next to `block` across `direction`.
    #[inline]
    pub fn connections(&self, direction: Direction, block: usize) -> &[usize] {
        &self.connections[direction.index()][block]
    }

    /// How many blocks of `group` connect to `block` across `direction`.
    #[inline]
    pub fn group_adjacency(&self, direction: Direction, block: usize, group: GroupId) -> u32 {
        let group_count = self.group_count();
        if group >= group_count {
            return 0;
        }
        self.group_adjacency[(direction.index() * self.blocks.len() + block) * group_count + group]
    }

    /// Number of neighbours `block` would have across `direction` if the
    /// neighbouring cell allowed exactly the groups in `mask`.
    pub fn support_for_mask(&self, direction: Direction, block: usize, mask: InputWaveCell) -> u32 {
        let group_count = self.group_count();
        let row = (direction.index() * self.blocks.len() + block) * group_count;
        mask.groups(group_count)
            .map(|g| self.group_adjacency[row + g])
            .sum()
    }

    /// Authored weights of every block, ready for per-solver overrides.
    pub fn default_weights(&self) -> BlockWeights {
        BlockWeights::from_catalog(self)
    }

    pub fn resources(&self, index: usize) -> &BlockResources {
        &self.resources[index]
    }

    /// Mesh, material and template references of the block with `hash`.
    pub fn get_block_resources_by_hash(&self, hash: BlockHash) -> Option<&BlockResources> {
        self.get_block_index(hash).map(|index| &self.resources[index])
    }

    /// Releases render-side references. Solving tables stay usable.
    pub fn dispose(&mut self) {
        let released = self
            .resources
            .iter()
            .filter(|r| r.mesh.is_some() || r.template.is_some())
            .count();
        for resources in &mut self.resources {
            *resources = BlockResources::default();
        }
        info!("Released resources of {released} blocks");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EMPTY_BLOCK, SOLID_BLOCK};

    #[test]
    fn builtin_catalog_layout() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.hash_of(EMPTY_BLOCK), EMPTY_HASH);
        assert_eq!(catalog.hash_of(SOLID_BLOCK), SOLID_HASH);
        assert_eq!(catalog.group_range(EMPTY_GROUP), 0..1);
        assert_eq!(catalog.group_range(SOLID_GROUP), 1..2);
        assert_eq!(catalog.group_range(crate::BASE_GROUP), 2..2);
        assert_eq!(catalog.group_range(99), 0..0);
    }

    #[test]
    fn empty_and_solid_only_connect_to_themselves() {
        let catalog = Catalog::builtin();
        for d in Direction::ALL {
            assert_eq!(catalog.connections(d, EMPTY_BLOCK), &[EMPTY_BLOCK]);
            assert_eq!(catalog.connections(d, SOLID_BLOCK), &[SOLID_BLOCK]);
            assert_eq!(catalog.group_adjacency(d, EMPTY_BLOCK, EMPTY_GROUP), 1);
            assert_eq!(catalog.group_adjacency(d, EMPTY_BLOCK, SOLID_GROUP), 0);
        }
    }

    #[test]
    fn support_for_mask_sums_groups() {
        let catalog = Catalog::builtin();
        let d = Direction::Up;
        assert_eq!(catalog.support_for_mask(d, SOLID_BLOCK, InputWaveCell::ALL_GROUPS), 1);
        assert_eq!(
            catalog.support_for_mask(d, SOLID_BLOCK, InputWaveCell::single(EMPTY_GROUP)),
            0
        );
    }
}
