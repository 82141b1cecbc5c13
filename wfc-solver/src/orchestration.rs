//! Dependency-ordered solving of several neighbouring regions.
//!
//! Each [`RegionBuilder`] owns a level and may name other builders as the
//! boundary on any face. Rebuilding a subset solves builders whose boundary
//! builders are already done, in parallel waves, and rolls every level of the
//! subset back if any of them fails.

use crate::boundary::{Boundary, GroupsBoundary, LevelBoundary};
use crate::level::{read_level, write_level, LevelData, SharedInputWave, SharedLevel};
use crate::solver::{ExecutionMode, Solver, SolverConfig};
use crate::SolveError;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use wfc_catalog::{Catalog, Direction, InputWaveCell, DIRECTION_COUNT};

/// Attempts a builder gets when none is configured.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// What lies beyond one face of a builder's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundarySource {
    /// The level of another builder, by index.
    Builder(usize),
    /// A constant group mask.
    Groups(InputWaveCell),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("Unknown builder index {0}")]
    UnknownBuilder(usize),
    #[error("Builder {0} uses itself as a boundary")]
    SelfBoundary(usize),
    #[error("Requested builders span {0} connected groups")]
    SpansGroups(usize),
    #[error("Builder '{name}' could not be configured: {source}")]
    Solve {
        name: String,
        #[source]
        source: SolveError,
    },
}

/// One region taking part in a multi-region rebuild.
#[derive(Debug, Clone)]
pub struct RegionBuilder {
    pub name: String,
    pub level: SharedLevel,
    pub input_wave: Option<SharedInputWave>,
    pub boundaries: [Option<BoundarySource>; DIRECTION_COUNT],
    /// One entry per weight group, negative keeps the authored weight.
    pub weight_overrides: Option<Vec<f32>>,
    /// Boundaries only constrain the base layer of this level.
    pub base_layer_only: bool,
    pub max_iterations: u32,
    pub seed: Option<u64>,
}

impl RegionBuilder {
    pub fn new(name: impl Into<String>, level: SharedLevel) -> Self {
        Self {
            name: name.into(),
            level,
            input_wave: None,
            boundaries: [None; DIRECTION_COUNT],
            weight_overrides: None,
            base_layer_only: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }

    pub fn with_input_wave(mut self, input_wave: SharedInputWave) -> Self {
        self.input_wave = Some(input_wave);
        self
    }

    pub fn with_boundary(mut self, direction: Direction, source: BoundarySource) -> Self {
        self.boundaries[direction.index()] = Some(source);
        self
    }

    pub fn with_weight_overrides(mut self, overrides: Vec<f32>) -> Self {
        self.weight_overrides = Some(overrides);
        self
    }

    pub fn with_base_layer_only(mut self, base_layer_only: bool) -> Self {
        self.base_layer_only = base_layer_only;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Indices of the builders this one reads as boundaries.
    pub fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.boundaries.iter().filter_map(|source| match source {
            Some(BoundarySource::Builder(index)) => Some(*index),
            _ => None,
        })
    }
}

/// Schedules rebuilds of a set of builders sharing one catalog.
#[derive(Debug)]
pub struct RegionScheduler {
    catalog: Arc<Catalog>,
    builders: Vec<RegionBuilder>,
    mode: ExecutionMode,
    cancel: Arc<AtomicBool>,
}

impl RegionScheduler {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            builders: Vec::new(),
            mode: ExecutionMode::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Execution mode of every per-builder solver.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds a builder and returns its index.
    pub fn add_builder(&mut self, builder: RegionBuilder) -> usize {
        self.builders.push(builder);
        self.builders.len() - 1
    }

    pub fn builders(&self) -> &[RegionBuilder] {
        &self.builders
    }

    pub fn builder(&self, index: usize) -> Option<&RegionBuilder> {
        self.builders.get(index)
    }

    /// Flag that stops a running rebuild before its next builder starts.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn validate(&self) -> Result<(), OrchestrationError> {
        for (index, builder) in self.builders.iter().enumerate() {
            for dependency in builder.dependencies() {
                if dependency == index {
                    return Err(OrchestrationError::SelfBoundary(index));
                }
                if dependency >= self.builders.len() {
                    return Err(OrchestrationError::UnknownBuilder(dependency));
                }
            }
        }
        Ok(())
    }

    /// Builders linked through boundary references in either direction.
    ///
    /// Each group is sorted; groups are ordered by their smallest member.
    pub fn connected_groups(&self) -> Vec<Vec<usize>> {
        let mut sets = DisjointSets::new(self.builders.len());
        for (index, builder) in self.builders.iter().enumerate() {
            for dependency in builder.dependencies().filter(|&d| d < self.builders.len()) {
                sets.union(index, dependency);
            }
        }
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for index in 0..self.builders.len() {
            by_root.entry(sets.find(index)).or_default().push(index);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        groups.sort_by_key(|group| group[0]);
        groups
    }

    /// Rebuilds every connected group. True only if all of them succeed.
    pub fn rebuild_all(&self) -> Result<bool, OrchestrationError> {
        let mut all_solved = true;
        for group in self.connected_groups() {
            all_solved &= self.rebuild(&group)?;
        }
        Ok(all_solved)
    }

    /// Rebuilds `subset`, which must lie within one connected group.
    ///
    /// Returns `Ok(false)` if any builder exhausted its attempts or the
    /// rebuild was cancelled; every level of the subset is then restored.
    /// Levels are not cleared first, so a dependency cycle is seeded by the
    /// blocks its members held before the rebuild.
    pub fn rebuild(&self, subset: &[usize]) -> Result<bool, OrchestrationError> {
        self.validate()?;
        let mut members: Vec<usize> = subset.to_vec();
        members.sort_unstable();
        members.dedup();
        if let Some(&unknown) = members.iter().find(|&&i| i >= self.builders.len()) {
            return Err(OrchestrationError::UnknownBuilder(unknown));
        }
        if members.is_empty() {
            return Ok(true);
        }
        let groups = self.connected_groups();
        let spanned = groups
            .iter()
            .filter(|group| group.iter().any(|i| members.binary_search(i).is_ok()))
            .count();
        if spanned > 1 {
            return Err(OrchestrationError::SpansGroups(spanned));
        }

        let snapshots: Vec<(usize, LevelData)> = members
            .iter()
            .map(|&i| (i, read_level(&self.builders[i].level).clone()))
            .collect();
        self.cancel.store(false, Ordering::Relaxed);

        match self.solve_in_waves(&members) {
            Ok(true) => {
                info!("Rebuilt {} regions", members.len());
                Ok(true)
            }
            outcome => {
                self.restore(snapshots);
                outcome
            }
        }
    }

    fn restore(&self, snapshots: Vec<(usize, LevelData)>) {
        warn!("Rebuild failed, restoring {} regions", snapshots.len());
        for (index, snapshot) in snapshots {
            *write_level(&self.builders[index].level) = snapshot;
        }
    }

    fn solve_in_waves(&self, members: &[usize]) -> Result<bool, OrchestrationError> {
        let in_subset = |i: usize| members.binary_search(&i).is_ok();
        let mut outstanding: BTreeMap<usize, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &i in members {
            let mut count = 0;
            for dependency in self.builders[i].dependencies().filter(|&d| in_subset(d)) {
                count += 1;
                dependents.entry(dependency).or_default().push(i);
            }
            outstanding.insert(i, count);
        }

        let mut scheduled: Vec<usize> = Vec::new();
        let mut ready: Vec<usize> = outstanding
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&i, _)| i)
            .collect();
        scheduled.extend(&ready);

        let mut solved = 0;
        while solved < members.len() {
            if self.cancel.load(Ordering::Relaxed) {
                info!("Rebuild cancelled");
                return Ok(false);
            }
            if ready.is_empty() {
                // The forced builder reads its cyclic neighbours' levels as last
                // committed: their previous blocks if any, unset cells otherwise.
                let Some(forced) = outstanding
                    .iter()
                    .filter(|(i, _)| !scheduled.contains(*i))
                    .min_by_key(|(&i, &count)| (count, i))
                    .map(|(&i, _)| i)
                else {
                    break;
                };
                warn!(
                    "Dependency cycle, forcing '{}' with {} unsolved boundaries",
                    self.builders[forced].name, outstanding[&forced]
                );
                scheduled.push(forced);
                ready.push(forced);
            }

            let wave = std::mem::take(&mut ready);
            debug!("Solving wave of {} regions", wave.len());
            let results: Vec<(usize, Option<Result<u32, SolveError>>)> = wave
                .par_iter()
                .map(|&i| {
                    if self.cancel.load(Ordering::Relaxed) {
                        return (i, None);
                    }
                    let result = self.solve_builder(i);
                    if !matches!(result, Ok(n) if n > 0) {
                        self.cancel.store(true, Ordering::Relaxed);
                    }
                    (i, Some(result))
                })
                .collect();

            for (i, result) in results {
                match result {
                    Some(Ok(n)) if n > 0 => {
                        solved += 1;
                        for &dependent in dependents.get(&i).into_iter().flatten() {
                            if let Some(count) = outstanding.get_mut(&dependent) {
                                *count = count.saturating_sub(1);
                                if *count == 0 && !scheduled.contains(&dependent) {
                                    scheduled.push(dependent);
                                    ready.push(dependent);
                                }
                            }
                        }
                    }
                    Some(Err(source)) => {
                        return Err(OrchestrationError::Solve {
                            name: self.builders[i].name.clone(),
                            source,
                        });
                    }
                    Some(Ok(_)) => {
                        warn!("Region '{}' found no solution", self.builders[i].name);
                        return Ok(false);
                    }
                    None => return Ok(false),
                }
            }
        }
        Ok(solved == members.len())
    }

    fn solve_builder(&self, index: usize) -> Result<u32, SolveError> {
        let builder = &self.builders[index];
        let (region, base_layer) = {
            let level = read_level(&builder.level);
            (*level.bounds(), level.base_layer())
        };

        let mut solver = Solver::new(SolverConfig::new(region.dimensions()).with_mode(self.mode));
        solver.set_catalog(Arc::clone(&self.catalog));
        solver.set_level_data(Arc::clone(&builder.level));
        solver.set_input_wave(builder.input_wave.clone());
        if let Some(overrides) = &builder.weight_overrides {
            solver.override_group_weights(overrides)?;
        }
        for direction in Direction::ALL {
            let boundary = builder.boundaries[direction.index()].map(|source| match source {
                BoundarySource::Builder(other) => {
                    let other = &self.builders[other];
                    Boundary::Level(LevelBoundary {
                        level: Arc::clone(&other.level),
                        input_wave: other.input_wave.clone(),
                        base_layer_only: builder.base_layer_only,
                        fallback: None,
                    })
                }
                BoundarySource::Groups(mask) => Boundary::Groups(GroupsBoundary {
                    mask,
                    base_layer: builder.base_layer_only.then_some(base_layer),
                }),
            });
            solver.set_boundary(direction, boundary);
        }

        debug!("Solving region '{}'", builder.name);
        solver.solve(region, builder.max_iterations, builder.seed)
    }
}

/// Union-find with path halving.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_sets_merge_transitively() {
        let mut sets = DisjointSets::new(5);
        sets.union(0, 3);
        sets.union(3, 4);
        assert_eq!(sets.find(4), sets.find(0));
        assert_ne!(sets.find(1), sets.find(0));
        assert_eq!(sets.find(2), 2);
    }
}
