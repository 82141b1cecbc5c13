use crate::actions::{Action, ActionGroup};
use crate::fill::ConnectionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identity of a compiled block. `0` never names a block.
pub type BlockHash = u64;
/// Index of a semantic group.
pub type GroupId = usize;

/// Hash stored in level data for cells that hold no block yet.
pub const UNSET_HASH: BlockHash = 0;
/// Reserved hash of the built-in Empty block.
pub const EMPTY_HASH: BlockHash = 1;
/// Reserved hash of the built-in Solid block.
pub const SOLID_HASH: BlockHash = 2;

/// Catalog index of the built-in Empty block.
pub const EMPTY_BLOCK: usize = 0;
/// Catalog index of the built-in Solid block.
pub const SOLID_BLOCK: usize = 1;

/// Group holding only the built-in Empty block.
pub const EMPTY_GROUP: GroupId = 0;
/// Group of solid blocks, starting with the built-in Solid block.
pub const SOLID_GROUP: GroupId = 1;
/// Default group for authored blocks.
pub const BASE_GROUP: GroupId = 2;
/// Names of the built-in groups, by index.
pub const BUILTIN_GROUPS: [&str; 3] = ["Empty", "Solid", "Base"];

/// Default weight group.
pub const DEFAULT_WEIGHT_GROUP: usize = 0;
/// Name of the default weight group.
pub const DEFAULT_WEIGHT_GROUP_NAME: &str = "Default";

/// Errors that make an authored repository impossible to compile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Two layers share an index.
    #[error("Duplicate layer index {0}")]
    DuplicateLayer(usize),
    /// Layer indices must be contiguous from zero.
    #[error("Missing layer index {0}")]
    MissingLayer(usize),
    /// An authored block has neither a mesh nor a template.
    #[error("Block '{0}' has no mesh or template")]
    MissingMesh(String),
    /// A big block references a block name that does not exist.
    #[error("Big block '{big_block}' references unknown block '{block}'")]
    UnknownBlock { big_block: String, block: String },
    /// The cell array of a big block does not match its size.
    #[error("Big block '{name}' has {found} cells but its size needs {expected}")]
    BigBlockShape {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Weight is negative, NaN or infinite.
    #[error("Block '{0}' has invalid weight {1}")]
    InvalidWeight(String, String),
    /// More groups than an input wave cell can address.
    #[error("{0} groups declared, at most {} are supported", crate::input_wave::MAX_GROUPS)]
    TooManyGroups(usize),
    /// An authored connection id does not leave room for the face mask.
    #[error("Block '{0}' uses connection id {1}, above the maximum {}", crate::fill::MAX_BASE_CONNECTION)]
    ConnectionIdOverflow(String, ConnectionId),
}

/// Authored description of a whole block repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryDescriptor {
    /// User group names, appended after the built-in groups.
    pub groups: Vec<String>,
    /// Weight group names, appended after `Default`.
    pub weight_groups: Vec<String>,
    /// Layers of authored content; indices must be `0..n`.
    pub layers: Vec<LayerDescriptor>,
}

/// One authoring layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDescriptor {
    pub index: usize,
    pub name: String,
    pub blocks: Vec<BlockDescriptor>,
    pub big_blocks: Vec<BigBlockDescriptor>,
}

/// One authored block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDescriptor {
    pub name: String,
    pub mesh: Option<String>,
    pub material: Option<String>,
    pub template: Option<String>,
    /// Corner occupancy code.
    pub fill: u8,
    /// Base connection id per face, indexed by [`crate::Direction`].
    pub connections: [ConnectionId; 6],
    pub weight: f32,
    pub group: Option<String>,
    pub weight_group: Option<String>,
    pub actions: ActionGroup,
}

impl Default for BlockDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: None,
            material: None,
            template: None,
            fill: 0,
            connections: [0; 6],
            weight: 1.0,
            group: None,
            weight_group: None,
            actions: ActionGroup::None,
        }
    }
}

/// A rigid multi-cell composite.
///
/// `cells` is laid out x-fastest (`z * sx * sy + y * sx + x`); each entry
/// lists the names of the blocks allowed in that cell, empty for cells that
/// are not part of the composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BigBlockDescriptor {
    pub name: String,
    pub size: [usize; 3],
    pub cells: Vec<Vec<String>>,
    pub weight: f32,
    pub group: Option<String>,
    pub weight_group: Option<String>,
    pub actions: ActionGroup,
}

impl Default for BigBlockDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: [1, 1, 1],
            cells: Vec::new(),
            weight: 1.0,
            group: None,
            weight_group: None,
            actions: ActionGroup::None,
        }
    }
}

/// Render-side references of a block, handed to mesh/template consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockResources {
    pub mesh: Option<String>,
    pub material: Option<String>,
    pub template: Option<String>,
}

/// A compiled, placeable block variant.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub hash: BlockHash,
    pub group: GroupId,
    pub weight_group: usize,
    pub weight: f32,
    pub fill: u8,
    /// Composite connection id per face.
    pub connections: [ConnectionId; 6],
    pub layer: usize,
    /// Actions applied to the authored block to produce this variant.
    pub actions: Vec<Action>,
    /// Name of the big block this cell belongs to, if any.
    pub big_block: Option<String>,
}

impl Block {
    /// Whether `other` may sit next to this block across `direction`.
    #[inline]
    pub fn connects_to(&self, other: &Block, direction: crate::Direction) -> bool {
        self.connections[direction.index()] == other.connections[direction.opposite().index()]
    }
}
