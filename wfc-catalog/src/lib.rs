//! Block catalog for 3D constraint solving.
//!
//! Authored repositories ([`RepositoryDescriptor`]) are compiled into an
//! immutable [`Catalog`]: every block variant gets a stable hash, composite
//! connection ids derived from its corner fill, and precomputed adjacency
//! tables the solver queries in its inner loops.

use thiserror::Error;

pub mod actions;
pub mod catalog;
pub mod compiler;
pub mod direction;
pub mod fill;
pub mod formats;
pub mod input_wave;
pub mod loader;
pub mod types;
pub mod weights;

pub use actions::{Action, ActionGroup};
pub use catalog::Catalog;
pub use direction::{Direction, DIRECTION_COUNT};
pub use fill::{ConnectionId, EMPTY_FILL, SOLID_FILL};
pub use input_wave::{InputWaveCell, MAX_GROUPS};
pub use types::*;
pub use weights::BlockWeights;

/// Errors raised while loading a repository file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error reading file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse repository ({format}): {message}")]
    ParseError {
        format: &'static str,
        message: String,
    },
    #[error("Unsupported repository format: '{0}'")]
    UnsupportedFormat(String),
    #[error("Invalid repository: {0}")]
    Catalog(#[from] CatalogError),
}
