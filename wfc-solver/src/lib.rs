//! Constraint solver for 3D block levels.
//!
//! A [`Solver`] fills a region of a [`LevelData`] with blocks from a compiled
//! [`wfc_catalog::Catalog`] such that every pair of face-adjacent blocks
//! connects, honouring per-cell group masks, the resolved blocks around the
//! region and configurable boundaries beyond the level. [`RegionScheduler`]
//! solves several neighbouring levels in dependency order.

/// Constraints at the faces of a level.
pub mod boundary;
/// Generic 3D grid storage.
pub mod grid;
/// Level bounds and resolved block storage.
pub mod level;
/// Cell selection and weighted collapse.
pub mod observe;
/// Multi-region scheduling.
pub mod orchestration;
/// Scoped stage timings.
pub mod profiler;
/// Sequential and phased constraint propagation.
pub mod propagator;
/// The solve loop.
pub mod solver;
/// Per-cell candidate state.
pub mod wave;

pub use boundary::{Boundary, BoundaryConstraint, GroupsBoundary, LevelBoundary};
pub use grid::Grid;
pub use level::{input_wave_for, read_level, write_level, Bounds, InputWave, LevelData, SharedInputWave, SharedLevel};
pub use orchestration::{BoundarySource, OrchestrationError, RegionBuilder, RegionScheduler};
pub use profiler::{ProfileMetric, Profiler};
pub use propagator::DEFAULT_PARALLEL_THRESHOLD;
pub use solver::{AttemptStats, ExecutionMode, Solver, SolverConfig};

use std::fmt;
use thiserror::Error;

/// Point of an attempt where a contradiction surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fill,
    InteriorBoundary,
    ExteriorBoundary,
    Propagate,
    Observe,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fill => "fill",
            Stage::InteriorBoundary => "interior boundary validation",
            Stage::ExteriorBoundary => "exterior boundary validation",
            Stage::Propagate => "propagation",
            Stage::Observe => "observation",
        };
        f.write_str(name)
    }
}

/// Errors rejecting a solve before any attempt runs.
///
/// Running out of attempts is not an error; `solve` returns `Ok(0)` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// `solve` needs a catalog.
    #[error("No block catalog set on the solver")]
    MissingCatalog,
    /// `solve` needs level data.
    #[error("No level data set on the solver")]
    MissingLevel,
    #[error("Region has zero volume")]
    EmptyRegion,
    /// The region is larger than the solver was built for along some axis.
    #[error("Region {region:?} exceeds solver capacity {capacity:?}")]
    RegionExceedsCapacity { region: [usize; 3], capacity: [usize; 3] },
    #[error("Region is not contained in the level bounds")]
    RegionOutsideLevel,
    #[error("Input wave has no cells")]
    EmptyInputWave,
    /// The input wave must cover the level bounds exactly.
    #[error("Input wave dimensions {found:?} do not match level dimensions {expected:?}")]
    InputWaveMismatch { expected: [usize; 3], found: [usize; 3] },
    /// Weight overrides need one entry per weight group.
    #[error("Expected {expected} weight group overrides, got {found}")]
    WeightOverrideLength { expected: usize, found: usize },
    /// Only raised with the `debug-contradictions` feature.
    #[cfg(feature = "debug-contradictions")]
    #[error("Contradiction during {stage} at cell {cell}")]
    Contradiction { stage: Stage, cell: usize },
}
