//! The constraint solver.
//!
//! Each attempt runs `Fill -> interior boundary -> exterior boundary ->
//! (propagate -> observe)*`. The first successful attempt is written back to
//! the level; failed attempts leave it untouched.

use crate::boundary::{Boundary, BoundaryConstraint, GroupsBoundary};
use crate::level::{read_level, write_level, Bounds, InputWave, SharedInputWave, SharedLevel};
use crate::observe::{observe, stable_pick, Observation};
use crate::profiler::Profiler;
use crate::propagator::{
    PhasedPropagator, PropagationContext, PropagationStrategy, SequentialPropagator, DEFAULT_PARALLEL_THRESHOLD,
};
use crate::wave::{neighbour_in, Ban, CellWave, Wave};
use crate::{SolveError, Stage};
use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use wfc_catalog::{
    BlockWeights, Catalog, Direction, GroupId, InputWaveCell, DIRECTION_COUNT, UNSET_HASH,
};

/// How a solver spreads its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Everything on the calling thread, propagation over a single stack.
    #[default]
    SingleThreaded,
    /// Parallel Fill and exterior validation, phased parallel propagation.
    MultiThreaded,
}

/// Fixed parameters of a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Largest region, per axis, the solver can handle.
    pub capacity: [usize; 3],
    /// Single- or multi-threaded execution.
    pub mode: ExecutionMode,
    /// Pending bans that trigger the first phased flush in multi-threaded mode.
    pub parallel_threshold: usize,
}

impl SolverConfig {
    /// Single-threaded config for regions up to `capacity`.
    pub fn new(capacity: [usize; 3]) -> Self {
        Self {
            capacity,
            mode: ExecutionMode::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Sets the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the pending-ban count that starts the phased flush.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// Counters of the most recent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptStats {
    /// Candidates admitted by Fill over all cells.
    pub initial_candidates: usize,
    /// Candidates removed, each (cell, block) at most once.
    pub bans: usize,
}

/// Reusable solver for regions up to its configured capacity.
///
/// Not meant for concurrent `solve` calls; use one solver per thread.
#[derive(Debug)]
pub struct Solver {
    config: SolverConfig,
    catalog: Option<Arc<Catalog>>,
    weights: Option<BlockWeights>,
    level: Option<SharedLevel>,
    input_wave: Option<SharedInputWave>,
    boundaries: [Option<Boundary>; DIRECTION_COUNT],
    wave: Wave,
    propagator: Box<dyn PropagationStrategy>,
    placed: Vec<u32>,
    profiler: Option<Profiler>,
    stats: AttemptStats,
}

impl Solver {
    /// Allocates the wave for `config.capacity`. Catalog and level are set separately.
    pub fn new(config: SolverConfig) -> Self {
        let propagator: Box<dyn PropagationStrategy> = match config.mode {
            ExecutionMode::SingleThreaded => Box::new(SequentialPropagator::new()),
            ExecutionMode::MultiThreaded => Box::new(PhasedPropagator::new(config.parallel_threshold)),
        };
        Self {
            config,
            catalog: None,
            weights: None,
            level: None,
            input_wave: None,
            boundaries: Default::default(),
            wave: Wave::with_capacity(config.capacity),
            propagator,
            placed: Vec::new(),
            profiler: None,
            stats: AttemptStats::default(),
        }
    }

    /// Configuration the solver was built with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Sets the catalog and resets weights to its authored values.
    pub fn set_catalog(&mut self, catalog: Arc<Catalog>) {
        self.weights = Some(catalog.default_weights());
        self.catalog = Some(catalog);
    }

    /// The catalog, if set.
    pub fn catalog(&self) -> Option<&Arc<Catalog>> {
        self.catalog.as_ref()
    }

    /// Level the solver reads neighbours from and commits into.
    pub fn set_level_data(&mut self, level: SharedLevel) {
        self.level = Some(level);
    }

    /// The level, if set.
    pub fn level_data(&self) -> Option<&SharedLevel> {
        self.level.as_ref()
    }

    /// Per-cell group masks over the level bounds. `None` allows every group.
    pub fn set_input_wave(&mut self, input_wave: Option<SharedInputWave>) {
        self.input_wave = input_wave;
    }

    /// Boundary beyond the level face in `direction`; `None` leaves it open.
    pub fn set_boundary(&mut self, direction: Direction, boundary: Option<Boundary>) {
        self.boundaries[direction.index()] = boundary;
    }

    /// Requires the neighbours across `direction` to belong to `group`,
    /// optionally only along the level's base layer.
    pub fn set_group_boundary(
        &mut self,
        group: GroupId,
        direction: Direction,
        base_layer_only: bool,
    ) -> Result<(), SolveError> {
        let base_layer = if base_layer_only {
            let level = self.level.as_ref().ok_or(SolveError::MissingLevel)?;
            Some(read_level(level).base_layer())
        } else {
            None
        };
        self.set_boundary(
            direction,
            Some(Boundary::Groups(GroupsBoundary {
                mask: InputWaveCell::single(group),
                base_layer,
            })),
        );
        Ok(())
    }

    /// Overrides weights per weight group; negative entries keep the authored weights.
    pub fn override_group_weights(&mut self, overrides: &[f32]) -> Result<(), SolveError> {
        let catalog = self.catalog.as_ref().ok_or(SolveError::MissingCatalog)?;
        if overrides.len() != catalog.weight_group_count() {
            return Err(SolveError::WeightOverrideLength {
                expected: catalog.weight_group_count(),
                found: overrides.len(),
            });
        }
        if let Some(weights) = self.weights.as_mut() {
            weights.override_weight_groups(overrides);
        }
        Ok(())
    }

    /// Effective block weights, overrides applied.
    pub fn weights(&self) -> Option<&BlockWeights> {
        self.weights.as_ref()
    }

    /// Attaches or detaches the stage profiler.
    pub fn set_profiler(&mut self, profiler: Option<Profiler>) {
        self.profiler = profiler;
    }

    /// The attached profiler, if any.
    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    /// Counters of the last attempt of the last `solve`.
    pub fn last_attempt_stats(&self) -> AttemptStats {
        self.stats
    }

    /// The wave as left by the last attempt.
    pub fn wave(&self) -> &Wave {
        &self.wave
    }

    /// Solves `region` (world coordinates, inside the level) with up to
    /// `max_iterations` attempts.
    ///
    /// Returns the 1-based attempt that succeeded, or `0` when every attempt
    /// hit a contradiction. Only a successful attempt writes to the level.
    pub fn solve(&mut self, region: Bounds, max_iterations: u32, seed: Option<u64>) -> Result<u32, SolveError> {
        let catalog = self.catalog.clone().ok_or(SolveError::MissingCatalog)?;
        let level = self.level.clone().ok_or(SolveError::MissingLevel)?;
        let level_bounds = *read_level(&level).bounds();
        self.validate(&region, &level_bounds)?;

        let Self {
            config,
            weights,
            input_wave,
            boundaries,
            wave,
            propagator,
            placed,
            profiler,
            stats,
            ..
        } = self;
        let Some(weights) = weights.as_ref() else {
            return Err(SolveError::MissingCatalog);
        };

        let attempt = Attempt::new(
            &catalog,
            weights,
            &level,
            level_bounds,
            input_wave.as_deref(),
            boundaries,
            region,
            config.mode,
            profiler.as_ref(),
        );

        let base_seed = seed.unwrap_or_else(time_seed);
        for iteration in 1..=max_iterations {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(u64::from(iteration)));
            *stats = AttemptStats::default();
            if attempt.run(wave, propagator.as_mut(), placed, &mut rng, stats)? {
                let _guard = profiler.as_ref().map(|p| p.profile("commit"));
                attempt.commit(wave);
                info!(
                    "Solved {} cells at {:?} on attempt {iteration}/{max_iterations}",
                    region.volume(),
                    region.min.as_slice()
                );
                return Ok(iteration);
            }
            debug!("Attempt {iteration}/{max_iterations} failed");
        }
        warn!(
            "No solution for region at {:?} after {max_iterations} attempts",
            region.min.as_slice()
        );
        Ok(0)
    }

    fn validate(&self, region: &Bounds, level_bounds: &Bounds) -> Result<(), SolveError> {
        if region.volume() == 0 {
            return Err(SolveError::EmptyRegion);
        }
        let dims = region.dimensions();
        if dims.iter().zip(&self.config.capacity).any(|(d, c)| d > c) {
            return Err(SolveError::RegionExceedsCapacity {
                region: dims,
                capacity: self.config.capacity,
            });
        }
        if !level_bounds.contains_bounds(region) {
            return Err(SolveError::RegionOutsideLevel);
        }
        if let Some(input_wave) = &self.input_wave {
            if input_wave.is_empty() {
                return Err(SolveError::EmptyInputWave);
            }
            if input_wave.dimensions() != level_bounds.dimensions() {
                return Err(SolveError::InputWaveMismatch {
                    expected: level_bounds.dimensions(),
                    found: input_wave.dimensions(),
                });
            }
        }
        Ok(())
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Ends an attempt at `stage`.
#[cfg(not(feature = "debug-contradictions"))]
fn fail(stage: Stage, cell: usize) -> Result<bool, SolveError> {
    debug!("Contradiction during {stage} at cell {cell}");
    Ok(false)
}

/// Ends the solve at the first contradiction so it can be inspected.
#[cfg(feature = "debug-contradictions")]
fn fail(stage: Stage, cell: usize) -> Result<bool, SolveError> {
    debug!("Contradiction during {stage} at cell {cell}");
    Err(SolveError::Contradiction { stage, cell })
}

/// Everything one attempt reads, borrowed from the solver.
struct Attempt<'a> {
    catalog: &'a Catalog,
    weights: &'a BlockWeights,
    level: &'a SharedLevel,
    level_bounds: Bounds,
    boundaries: &'a [Option<Boundary>; DIRECTION_COUNT],
    region: Bounds,
    size: [usize; 3],
    mode: ExecutionMode,
    profiler: Option<&'a Profiler>,
    input_wave: Option<&'a InputWave>,
    /// Input mask of every region cell.
    masks: Vec<InputWaveCell>,
}

impl<'a> Attempt<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        catalog: &'a Catalog,
        weights: &'a BlockWeights,
        level: &'a SharedLevel,
        level_bounds: Bounds,
        input_wave: Option<&'a InputWave>,
        boundaries: &'a [Option<Boundary>; DIRECTION_COUNT],
        region: Bounds,
        mode: ExecutionMode,
        profiler: Option<&'a Profiler>,
    ) -> Self {
        let mut attempt = Self {
            catalog,
            weights,
            level,
            level_bounds,
            boundaries,
            region,
            size: region.dimensions(),
            mode,
            profiler,
            input_wave,
            masks: Vec::new(),
        };
        attempt.masks = region.positions().map(|world| attempt.mask_at(world)).collect();
        attempt
    }

    fn mask_at(&self, world: Vector3<i32>) -> InputWaveCell {
        self.input_wave
            .and_then(|wave| wave.get_local(world - self.level_bounds.min).copied())
            .unwrap_or(InputWaveCell::ALL_GROUPS)
    }

    fn world_of(&self, index: usize) -> Vector3<i32> {
        let [w, h, _] = self.size;
        let local = [index % w, (index / w) % h, index / (w * h)];
        self.region.min + Vector3::new(local[0] as i32, local[1] as i32, local[2] as i32)
    }

    /// World position across `direction` of a cell on the region's face,
    /// `None` when the neighbour is inside the region.
    fn outside_neighbour(&self, index: usize, direction: Direction) -> Option<Vector3<i32>> {
        if neighbour_in(self.size, index, direction).is_some() {
            return None;
        }
        let (dx, dy, dz) = direction.offset();
        Some(self.world_of(index) + Vector3::new(dx, dy, dz))
    }

    fn context(&self) -> PropagationContext<'_> {
        PropagationContext {
            catalog: self.catalog,
            weights: self.weights,
        }
    }

    /// Runs `visit` on every live cell, in parallel in multi-threaded mode,
    /// and gathers the bans it reports.
    fn for_each_cell<F>(&self, wave: &mut Wave, visit: F) -> Vec<Ban>
    where
        F: Fn(usize, &mut CellWave, &mut Vec<Ban>) + Sync,
    {
        match self.mode {
            ExecutionMode::SingleThreaded => {
                let mut bans = Vec::new();
                for (index, cell) in wave.cells_mut().iter_mut().enumerate() {
                    visit(index, cell, &mut bans);
                }
                bans
            }
            ExecutionMode::MultiThreaded => wave
                .cells_mut()
                .par_iter_mut()
                .enumerate()
                .fold(Vec::new, |mut bans, (index, cell)| {
                    visit(index, cell, &mut bans);
                    bans
                })
                .reduce(Vec::new, |mut a, mut b| {
                    a.append(&mut b);
                    a
                }),
        }
    }

    /// One full attempt. `Ok(true)` leaves a resolved wave ready to commit.
    fn run(
        &self,
        wave: &mut Wave,
        propagator: &mut dyn PropagationStrategy,
        placed: &mut Vec<u32>,
        rng: &mut StdRng,
        stats: &mut AttemptStats,
    ) -> Result<bool, SolveError> {
        let block_count = self.catalog.len();
        wave.reset(self.size, block_count);
        propagator.reset();
        placed.clear();
        placed.resize(block_count, 0);

        let fill_bans = {
            let _guard = self.profiler.map(|p| p.profile("fill"));
            self.for_each_cell(wave, |index, cell, bans| self.fill_cell(index, cell, bans))
        };
        stats.initial_candidates =
            wave.cells().iter().map(CellWave::remaining).sum::<usize>() + fill_bans.len();
        if let Some(cell) = first_empty(wave) {
            return fail(Stage::Fill, cell);
        }
        self.enqueue(fill_bans, propagator, stats);

        let interior_bans = {
            let _guard = self.profiler.map(|p| p.profile("interior_boundary"));
            self.validate_interior(wave)
        };
        self.enqueue(interior_bans, propagator, stats);
        if let Some(cell) = first_empty(wave) {
            return fail(Stage::InteriorBoundary, cell);
        }

        let exterior_bans = {
            let _guard = self.profiler.map(|p| p.profile("exterior_boundary"));
            self.for_each_cell(wave, |index, cell, bans| self.validate_exterior(index, cell, bans))
        };
        self.enqueue(exterior_bans, propagator, stats);
        if let Some(cell) = first_empty(wave) {
            return fail(Stage::ExteriorBoundary, cell);
        }

        let volume = wave.volume();
        loop {
            {
                let _guard = self.profiler.map(|p| p.profile("propagate"));
                match propagator.propagate(wave, self.context()) {
                    Ok(cascaded) => stats.bans += cascaded,
                    Err(contradiction) => return fail(Stage::Propagate, contradiction.cell),
                }
            }

            let _guard = self.profiler.map(|p| p.profile("observe"));
            let cell = match observe(wave, rng) {
                Observation::Resolved => return Ok(true),
                Observation::Contradiction(cell) => return fail(Stage::Observe, cell),
                Observation::Collapse(cell) => cell,
            };
            let Some(chosen) = stable_pick(wave.cell(cell), self.weights, placed, volume, rng) else {
                return fail(Stage::Observe, cell);
            };
            placed[chosen] += 1;
            let others: Vec<usize> = wave.cell(cell).candidates().filter(|&b| b != chosen).collect();
            let target = wave.cell_mut(cell);
            for block in others {
                if target.ban(block, self.weights.weight(block)) {
                    propagator.push(Ban { cell, block });
                    stats.bans += 1;
                }
            }
        }
    }

    fn enqueue(&self, bans: Vec<Ban>, propagator: &mut dyn PropagationStrategy, stats: &mut AttemptStats) {
        stats.bans += bans.len();
        for ban in bans {
            propagator.push(ban);
        }
    }

    /// Admits every block allowed by the cell's mask, seeding support from the
    /// neighbours' masks. Edge directions start satisfied.
    fn fill_cell(&self, index: usize, cell: &mut CellWave, bans: &mut Vec<Ban>) {
        let catalog = self.catalog;
        let neighbour_masks =
            Direction::ALL.map(|d| neighbour_in(self.size, index, d).map(|n| self.masks[n]));
        for group in self.masks[index].groups(catalog.group_count()) {
            for block in catalog.group_range(group) {
                let support = Direction::ALL.map(|d| match neighbour_masks[d.index()] {
                    Some(mask) => catalog.support_for_mask(d, block, mask),
                    None => 1,
                });
                let weight = self.weights.weight(block);
                cell.admit(block, support, weight);
                if support.contains(&0) && cell.ban(block, weight) {
                    bans.push(Ban { cell: index, block });
                }
            }
        }
    }

    /// Stitches the region to resolved cells of the level around it.
    fn validate_interior(&self, wave: &mut Wave) -> Vec<Ban> {
        let level = read_level(self.level);
        let mut bans = Vec::new();
        for index in 0..wave.volume() {
            for direction in Direction::ALL {
                let Some(world) = self.outside_neighbour(index, direction) else {
                    continue;
                };
                let Some(hash) = level.get(world) else {
                    continue;
                };
                let constraint = if hash == UNSET_HASH {
                    BoundaryConstraint::Groups(self.mask_at(world))
                } else if self.catalog.get_block_index(hash).is_none() {
                    warn!("Unknown block hash {hash:#x} at {:?}, treating it as unset", world.as_slice());
                    BoundaryConstraint::Groups(self.mask_at(world))
                } else {
                    BoundaryConstraint::Block(hash)
                };
                self.constrain(index, wave.cell_mut(index), direction, constraint, &mut bans);
            }
        }
        bans
    }

    /// Applies the configured boundaries beyond the level's faces.
    fn validate_exterior(&self, index: usize, cell: &mut CellWave, bans: &mut Vec<Ban>) {
        for direction in Direction::ALL {
            let Some(boundary) = &self.boundaries[direction.index()] else {
                continue;
            };
            let Some(world) = self.outside_neighbour(index, direction) else {
                continue;
            };
            if self.level_bounds.contains(world) {
                continue;
            }
            self.constrain(index, cell, direction, boundary.evaluate(world), bans);
        }
    }

    /// Bans candidates of `cell` that cannot face `constraint` across `direction`.
    fn constrain(
        &self,
        index: usize,
        cell: &mut CellWave,
        direction: Direction,
        constraint: BoundaryConstraint,
        bans: &mut Vec<Ban>,
    ) {
        let catalog = self.catalog;
        let doomed: Vec<usize> = match constraint {
            BoundaryConstraint::None => return,
            BoundaryConstraint::Block(hash) => {
                let Some(neighbour) = catalog.get_block_index(hash) else {
                    warn!("Boundary names unknown block hash {hash:#x}, ignoring it");
                    return;
                };
                cell.candidates()
                    .filter(|&block| catalog.connections(direction, block).binary_search(&neighbour).is_err())
                    .collect()
            }
            BoundaryConstraint::Groups(mask) => cell
                .candidates()
                .filter(|&block| catalog.support_for_mask(direction, block, mask) == 0)
                .collect(),
        };
        for block in doomed {
            if cell.ban(block, self.weights.weight(block)) {
                bans.push(Ban { cell: index, block });
            }
        }
    }

    /// Writes the resolved hashes into the level.
    fn commit(&self, wave: &Wave) {
        let mut level = write_level(self.level);
        for (index, cell) in wave.cells().iter().enumerate() {
            let hash = cell.resolved().map_or(UNSET_HASH, |block| self.catalog.hash_of(block));
            level.set(self.world_of(index), hash);
        }
    }
}

fn first_empty(wave: &Wave) -> Option<usize> {
    wave.cells().iter().position(|cell| cell.remaining() == 0)
}
