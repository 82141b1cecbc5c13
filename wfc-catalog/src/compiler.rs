//! Compiles an authored [`RepositoryDescriptor`] into a [`Catalog`].
//!
//! Compilation validates layers, resolves group names, expands every block
//! and big block into its transformed variants, mints seam ids for the
//! internal faces of big blocks and derives a stable hash per variant.

use crate::actions::{apply_actions, Action};
use crate::catalog::Catalog;
use crate::direction::{Direction, DIRECTION_COUNT};
use crate::fill::{composite_ids, seam_id, ConnectionId, MAX_BASE_CONNECTION};
use crate::input_wave::MAX_GROUPS;
use crate::types::{
    BigBlockDescriptor, Block, BlockDescriptor, BlockHash, BlockResources, CatalogError, GroupId,
    RepositoryDescriptor, BASE_GROUP, BUILTIN_GROUPS, DEFAULT_WEIGHT_GROUP,
    DEFAULT_WEIGHT_GROUP_NAME, EMPTY_GROUP, SOLID_HASH,
};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

impl Catalog {
    /// Builds a catalog from an authored repository.
    pub fn compile(descriptor: &RepositoryDescriptor) -> Result<Catalog, CatalogError> {
        compile(descriptor)
    }
}

/// Builds a catalog from an authored repository.
pub fn compile(descriptor: &RepositoryDescriptor) -> Result<Catalog, CatalogError> {
    validate_layers(descriptor)?;

    let group_names = resolve_names(BUILTIN_GROUPS.iter().copied(), &descriptor.groups, "group");
    if group_names.len() > MAX_GROUPS {
        return Err(CatalogError::TooManyGroups(group_names.len()));
    }
    let weight_group_names = resolve_names(
        std::iter::once(DEFAULT_WEIGHT_GROUP_NAME),
        &descriptor.weight_groups,
        "weight group",
    );

    let mut layers: Vec<_> = descriptor.layers.iter().collect();
    layers.sort_by_key(|layer| layer.index);

    let mut by_name: HashMap<&str, &BlockDescriptor> = HashMap::new();
    let mut max_connection: ConnectionId = 0;
    for layer in &layers {
        for block in &layer.blocks {
            validate_block(block)?;
            for &id in &block.connections {
                if id > MAX_BASE_CONNECTION {
                    return Err(CatalogError::ConnectionIdOverflow(block.name.clone(), id));
                }
                max_connection = max_connection.max(id);
            }
            if by_name.insert(block.name.as_str(), block).is_some() {
                warn!("Block name '{}' declared twice, big blocks use the last one", block.name);
            }
        }
    }

    let mut compiler = Compiler {
        group_names: &group_names,
        weight_group_names: &weight_group_names,
        next_seam: max_connection + 1,
        blocks: Vec::new(),
        resources: Vec::new(),
    };

    for layer in &layers {
        debug!(
            "Compiling layer {} '{}': {} blocks, {} big blocks",
            layer.index,
            layer.name,
            layer.blocks.len(),
            layer.big_blocks.len()
        );
        for block in &layer.blocks {
            compiler.expand_block(block, layer.index);
        }
        for big_block in &layer.big_blocks {
            compiler.expand_big_block(big_block, layer.index, &by_name)?;
        }
    }

    let (blocks, resources) = dedupe(compiler.blocks, compiler.resources);
    info!(
        "Compiled {} block variants from {} layers",
        blocks.len(),
        layers.len()
    );
    Ok(Catalog::from_parts(
        blocks,
        resources,
        group_names,
        weight_group_names,
        layers.len(),
    ))
}

fn validate_layers(descriptor: &RepositoryDescriptor) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for layer in &descriptor.layers {
        if !seen.insert(layer.index) {
            return Err(CatalogError::DuplicateLayer(layer.index));
        }
    }
    for index in 0..descriptor.layers.len() {
        if !seen.contains(&index) {
            return Err(CatalogError::MissingLayer(index));
        }
    }
    Ok(())
}

fn validate_block(block: &BlockDescriptor) -> Result<(), CatalogError> {
    if block.mesh.is_none() && block.template.is_none() {
        return Err(CatalogError::MissingMesh(block.name.clone()));
    }
    validate_weight(&block.name, block.weight)
}

fn validate_weight(name: &str, weight: f32) -> Result<(), CatalogError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(CatalogError::InvalidWeight(name.to_owned(), weight.to_string()));
    }
    Ok(())
}

fn resolve_names<'a>(
    builtin: impl Iterator<Item = &'a str>,
    declared: &[String],
    kind: &str,
) -> Vec<String> {
    let mut names: Vec<String> = builtin.map(str::to_owned).collect();
    for name in declared {
        if names.contains(name) {
            warn!("Duplicate {kind} '{name}' ignored");
        } else {
            names.push(name.clone());
        }
    }
    names
}

/// Stable identity of a variant. Never returns the unset or built-in hashes.
fn block_hash(identity: &str, connections: &[ConnectionId; DIRECTION_COUNT], actions: &[Action]) -> BlockHash {
    let mut bytes = Vec::with_capacity(identity.len() + 1 + 4 * DIRECTION_COUNT + actions.len());
    bytes.extend_from_slice(identity.as_bytes());
    bytes.push(0xFF);
    for id in connections {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    bytes.extend(actions.iter().map(|a| a.code()));
    let hash = seahash::hash(&bytes);
    if hash <= SOLID_HASH {
        hash + SOLID_HASH + 1
    } else {
        hash
    }
}

fn mesh_identity(block: &BlockDescriptor) -> String {
    let mesh = block
        .mesh
        .as_deref()
        .or(block.template.as_deref())
        .unwrap_or(block.name.as_str());
    match &block.material {
        Some(material) => format!("{mesh}#{material}"),
        None => mesh.to_owned(),
    }
}

fn resources_of(block: &BlockDescriptor) -> BlockResources {
    BlockResources {
        mesh: block.mesh.clone(),
        material: block.material.clone(),
        template: block.template.clone(),
    }
}

/// Drops exact hash duplicates, keeping the first occurrence.
fn dedupe(blocks: Vec<Block>, resources: Vec<BlockResources>) -> (Vec<Block>, Vec<BlockResources>) {
    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .zip(resources)
        .filter(|(block, _)| {
            let fresh = seen.insert(block.hash);
            if !fresh {
                warn!("Dropping duplicate block variant '{}' ({:#x})", block.name, block.hash);
            }
            fresh
        })
        .unzip()
}

struct Compiler<'a> {
    group_names: &'a [String],
    weight_group_names: &'a [String],
    next_seam: ConnectionId,
    blocks: Vec<Block>,
    resources: Vec<BlockResources>,
}

impl Compiler<'_> {
    fn group(&self, name: Option<&str>, owner: &str) -> GroupId {
        let Some(name) = name else {
            return BASE_GROUP;
        };
        match self.group_names.iter().position(|g| g == name) {
            Some(EMPTY_GROUP) => {
                warn!("Block '{owner}' cannot join the Empty group, using Base");
                BASE_GROUP
            }
            Some(group) => group,
            None => {
                warn!("Block '{owner}' names unknown group '{name}', using Base");
                BASE_GROUP
            }
        }
    }

    fn weight_group(&self, name: Option<&str>, owner: &str) -> usize {
        let Some(name) = name else {
            return DEFAULT_WEIGHT_GROUP;
        };
        self.weight_group_names
            .iter()
            .position(|g| g == name)
            .unwrap_or_else(|| {
                warn!("Block '{owner}' names unknown weight group '{name}', using Default");
                DEFAULT_WEIGHT_GROUP
            })
    }

    fn mint_seam(&mut self) -> Result<ConnectionId, CatalogError> {
        let id = self.next_seam;
        if id > MAX_BASE_CONNECTION {
            return Err(CatalogError::ConnectionIdOverflow("big block seam".to_owned(), id));
        }
        self.next_seam += 1;
        Ok(id)
    }

    fn expand_block(&mut self, block: &BlockDescriptor, layer: usize) {
        let group = self.group(block.group.as_deref(), &block.name);
        let weight_group = self.weight_group(block.weight_group.as_deref(), &block.name);
        let identity = mesh_identity(block);
        for actions in block.actions.variants() {
            let (fill, base) = apply_actions(block.fill, block.connections, &actions);
            let connections = composite_ids(base, fill);
            self.blocks.push(Block {
                name: block.name.clone(),
                hash: block_hash(&identity, &connections, &actions),
                group,
                weight_group,
                weight: block.weight,
                fill,
                connections,
                layer,
                actions,
                big_block: None,
            });
            self.resources.push(resources_of(block));
        }
    }

    fn expand_big_block(
        &mut self,
        big: &BigBlockDescriptor,
        layer: usize,
        by_name: &HashMap<&str, &BlockDescriptor>,
    ) -> Result<(), CatalogError> {
        validate_weight(&big.name, big.weight)?;
        let [sx, sy, sz] = big.size;
        let expected = sx * sy * sz;
        if big.cells.len() != expected {
            return Err(CatalogError::BigBlockShape {
                name: big.name.clone(),
                expected,
                found: big.cells.len(),
            });
        }
        let mut members: Vec<Vec<&BlockDescriptor>> = Vec::with_capacity(expected);
        for names in &big.cells {
            let resolved = names
                .iter()
                .map(|name| {
                    by_name.get(name.as_str()).copied().ok_or_else(|| CatalogError::UnknownBlock {
                        big_block: big.name.clone(),
                        block: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            members.push(resolved);
        }

        let group = self.group(big.group.as_deref(), &big.name);
        let weight_group = self.weight_group(big.weight_group.as_deref(), &big.name);

        for actions in big.actions.variants() {
            // Move the whole arrangement, then seal its inner faces.
            let mut size = big.size;
            let mut placed: Vec<([usize; 3], &Vec<&BlockDescriptor>)> = Vec::new();
            for (index, cell) in members.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let mut pos = [index % sx, (index / sx) % sy, index / (sx * sy)];
                let mut cell_size = big.size;
                for &action in &actions {
                    (pos, cell_size) = action.map_cell(pos, cell_size);
                }
                size = cell_size;
                placed.push((pos, cell));
            }

            let slot = |p: [usize; 3]| p[2] * size[0] * size[1] + p[1] * size[0] + p[0];
            let mut occupied = vec![false; size[0] * size[1] * size[2]];
            for (pos, _) in &placed {
                occupied[slot(*pos)] = true;
            }

            let mut seams: HashMap<([usize; 3], Direction), ConnectionId> = HashMap::new();
            for (pos, _) in &placed {
                for d in [Direction::Right, Direction::Up, Direction::Forward] {
                    let mut next = *pos;
                    next[d.axis()] += 1;
                    if next[d.axis()] >= size[d.axis()] || !occupied[slot(next)] {
                        continue;
                    }
                    let minted = self.mint_seam()?;
                    seams.insert((*pos, d), minted);
                    seams.insert((next, d.opposite()), minted);
                }
            }

            for (pos, cell) in &placed {
                for member in cell.iter() {
                    let (fill, base) = apply_actions(member.fill, member.connections, &actions);
                    let mut connections = composite_ids(base, fill);
                    for d in Direction::ALL {
                        if let Some(&minted) = seams.get(&(*pos, d)) {
                            connections[d.index()] = seam_id(minted);
                        }
                    }
                    let identity = format!("{}@{}", mesh_identity(member), big.name);
                    self.blocks.push(Block {
                        name: format!("{}[{},{},{}]/{}", big.name, pos[0], pos[1], pos[2], member.name),
                        hash: block_hash(&identity, &connections, &actions),
                        group,
                        weight_group,
                        weight: big.weight,
                        fill,
                        connections,
                        layer,
                        actions: actions.clone(),
                        big_block: Some(big.name.clone()),
                    });
                    self.resources.push(resources_of(member));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionGroup;
    use crate::types::{LayerDescriptor, EMPTY_BLOCK, SOLID_BLOCK};

    fn block(name: &str, fill: u8) -> BlockDescriptor {
        BlockDescriptor {
            name: name.to_owned(),
            mesh: Some(format!("{name}.mesh")),
            fill,
            ..Default::default()
        }
    }

    fn repository(blocks: Vec<BlockDescriptor>, big_blocks: Vec<BigBlockDescriptor>) -> RepositoryDescriptor {
        RepositoryDescriptor {
            groups: vec!["Props".to_owned()],
            weight_groups: vec!["Rare".to_owned()],
            layers: vec![LayerDescriptor {
                index: 0,
                name: "base".to_owned(),
                blocks,
                big_blocks,
            }],
        }
    }

    #[test]
    fn builtins_keep_their_slots() {
        let catalog = compile(&repository(vec![block("slab", 0x33)], vec![])).unwrap();
        assert_eq!(catalog.hash_of(EMPTY_BLOCK), crate::EMPTY_HASH);
        assert_eq!(catalog.hash_of(SOLID_BLOCK), SOLID_HASH);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.group_range(BASE_GROUP), 2..3);
    }

    #[test]
    fn layers_must_be_contiguous() {
        let mut repo = repository(vec![], vec![]);
        repo.layers.push(LayerDescriptor {
            index: 0,
            ..Default::default()
        });
        assert_eq!(compile(&repo).unwrap_err(), CatalogError::DuplicateLayer(0));

        repo.layers[1].index = 2;
        assert_eq!(compile(&repo).unwrap_err(), CatalogError::MissingLayer(1));
    }

    #[test]
    fn rejects_missing_mesh_and_bad_weight() {
        let mut no_mesh = block("ghost", 0);
        no_mesh.mesh = None;
        assert!(matches!(
            compile(&repository(vec![no_mesh], vec![])),
            Err(CatalogError::MissingMesh(_))
        ));

        let mut heavy = block("heavy", 0);
        heavy.weight = -1.0;
        assert!(matches!(
            compile(&repository(vec![heavy], vec![])),
            Err(CatalogError::InvalidWeight(..))
        ));

        let mut zero = block("zero", 0);
        zero.weight = 0.0;
        assert!(compile(&repository(vec![zero], vec![])).is_ok());
    }

    #[test]
    fn empty_group_is_repaired() {
        let mut sneaky = block("sneaky", 0x33);
        sneaky.group = Some("Empty".to_owned());
        let mut lost = block("lost", 0x11);
        lost.group = Some("Nowhere".to_owned());
        let mut prop = block("prop", 0x22);
        prop.group = Some("Props".to_owned());
        let catalog = compile(&repository(vec![sneaky, lost, prop], vec![])).unwrap();
        assert_eq!(catalog.group_range(EMPTY_GROUP), 0..1);
        assert_eq!(catalog.group_range(BASE_GROUP).len(), 2);
        assert_eq!(catalog.group_range(3).len(), 1);
    }

    #[test]
    fn rotations_produce_distinct_variants() {
        // Corner piece: only the (1,0,0) corner occupied.
        let mut corner = block("corner", 0b0000_0010);
        corner.actions = ActionGroup::Rotate4;
        let catalog = compile(&repository(vec![corner], vec![])).unwrap();
        assert_eq!(catalog.len(), 6);
        let hashes: HashSet<_> = catalog.blocks().iter().map(|b| b.hash).collect();
        assert_eq!(hashes.len(), 6);
    }

    #[test]
    fn duplicate_declarations_are_dropped() {
        let mut slab = block("slab", 0x33);
        // A slab looks the same from every rotation, but the action codes differ.
        slab.actions = ActionGroup::Rotate4;
        let catalog = compile(&repository(vec![slab.clone()], vec![])).unwrap();
        assert_eq!(catalog.len(), 2 + 4);

        let duplicate = compile(&repository(vec![slab.clone(), slab], vec![])).unwrap();
        assert_eq!(duplicate.len(), 2 + 4);
    }

    #[test]
    fn big_block_seams_are_unique_and_paired() {
        let mut pillar = block("pillar", 0xFF);
        pillar.connections = [3; 6];
        let big = BigBlockDescriptor {
            name: "tower".to_owned(),
            size: [1, 2, 1],
            cells: vec![vec!["pillar".to_owned()], vec!["pillar".to_owned()]],
            ..Default::default()
        };
        let catalog = compile(&repository(vec![pillar], vec![big])).unwrap();
        let parts: Vec<&Block> = catalog
            .blocks()
            .iter()
            .filter(|b| b.big_block.is_some())
            .collect();
        assert_eq!(parts.len(), 2);
        let bottom = parts.iter().find(|b| b.name.starts_with("tower[0,0,0]")).unwrap();
        let top = parts.iter().find(|b| b.name.starts_with("tower[0,1,0]")).unwrap();
        assert!(bottom.connects_to(top, Direction::Up));
        assert_eq!(bottom.connections[Direction::Up.index()], seam_id(4));
        // Outer faces keep the authored id.
        assert_eq!(bottom.connections[Direction::Down.index()], (3 << 4) | 0xF);
        // The plain pillar cannot stack into the seam.
        let plain = catalog.blocks().iter().find(|b| b.name == "pillar").unwrap();
        assert!(!bottom.connects_to(plain, Direction::Up));
    }

    #[test]
    fn big_block_unknown_member_and_bad_shape() {
        let big = BigBlockDescriptor {
            name: "arch".to_owned(),
            size: [2, 1, 1],
            cells: vec![vec!["missing".to_owned()], vec![]],
            ..Default::default()
        };
        assert!(matches!(
            compile(&repository(vec![], vec![big.clone()])),
            Err(CatalogError::UnknownBlock { .. })
        ));

        let wrong = BigBlockDescriptor {
            cells: vec![vec![]],
            ..big
        };
        assert!(matches!(
            compile(&repository(vec![], vec![wrong])),
            Err(CatalogError::BigBlockShape { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn rotated_big_block_swaps_extents() {
        let mut beam = block("beam", 0xFF);
        beam.connections = [1; 6];
        let big = BigBlockDescriptor {
            name: "beam2".to_owned(),
            size: [2, 1, 1],
            cells: vec![vec!["beam".to_owned()], vec!["beam".to_owned()]],
            actions: ActionGroup::Rotate4,
            ..Default::default()
        };
        let catalog = compile(&repository(vec![beam], vec![big])).unwrap();
        let rotated: Vec<&Block> = catalog
            .blocks()
            .iter()
            .filter(|b| b.big_block.is_some() && b.actions == vec![Action::RotateY])
            .collect();
        assert_eq!(rotated.len(), 2);
        // After one turn the pair runs along Z.
        let back = rotated.iter().find(|b| b.name.contains("[0,0,0]")).unwrap();
        let front = rotated.iter().find(|b| b.name.contains("[0,0,1]")).unwrap();
        assert!(back.connects_to(front, Direction::Forward));
    }
}
