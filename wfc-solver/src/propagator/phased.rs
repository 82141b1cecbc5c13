//! Parallel propagation over a 3x3x3 spatial colouring.
//!
//! Cells whose coordinates agree modulo 3 never share a face neighbour, so all
//! bans of one phase can spread concurrently: every task owns the neighbours
//! of its cell exclusively. Phases run largest-first with a barrier between
//! them. After one full flush the propagator hands the remaining work to a
//! sequential stack for the rest of the attempt.

use crate::propagator::{Contradiction, PropagationContext, PropagationStrategy, SequentialPropagator};
use crate::wave::{Ban, CellWave, Wave};
use log::trace;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::HashMap;
use wfc_catalog::{Direction, DIRECTION_COUNT};

/// Pending bans above which the first parallel flush starts.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

const PHASE_COUNT: usize = 27;

#[derive(Debug)]
pub struct PhasedPropagator {
    threshold: usize,
    incoming: Vec<Ban>,
    buckets: Vec<Vec<Ban>>,
    flushed: bool,
    fallback: SequentialPropagator,
}

impl Default for PhasedPropagator {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_THRESHOLD)
    }
}

impl PhasedPropagator {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            incoming: Vec::new(),
            buckets: vec![Vec::new(); PHASE_COUNT],
            flushed: false,
            fallback: SequentialPropagator::new(),
        }
    }

    /// Whether this attempt already switched to sequential propagation.
    pub fn has_flushed(&self) -> bool {
        self.flushed
    }

    fn phase_of(wave: &Wave, cell: usize) -> usize {
        let [x, y, z] = wave.coords(cell);
        (z % 3) * 9 + (y % 3) * 3 + x % 3
    }

    fn clear_buckets(&mut self) {
        self.buckets.iter_mut().for_each(Vec::clear);
    }

    fn flush(&mut self, wave: &mut Wave, ctx: PropagationContext<'_>) -> Result<usize, Contradiction> {
        for ban in self.incoming.drain(..) {
            self.buckets[Self::phase_of(wave, ban.cell)].push(ban);
        }
        let mut order: Vec<usize> = (0..PHASE_COUNT).collect();
        order.sort_by_key(|&phase| Reverse(self.buckets[phase].len()));

        let mut cascaded = 0;
        for phase in order {
            let bans = std::mem::take(&mut self.buckets[phase]);
            if bans.is_empty() {
                continue;
            }
            trace!("Phase {phase}: spreading {} bans", bans.len());
            let produced = match run_phase(wave, bans, ctx) {
                Ok(produced) => produced,
                Err(contradiction) => {
                    self.clear_buckets();
                    return Err(contradiction);
                }
            };
            cascaded += produced.len();
            for ban in produced {
                self.buckets[Self::phase_of(wave, ban.cell)].push(ban);
            }
        }

        for bucket in &mut self.buckets {
            self.fallback.extend(bucket.drain(..));
        }
        Ok(cascaded)
    }
}

impl PropagationStrategy for PhasedPropagator {
    fn reset(&mut self) {
        self.incoming.clear();
        self.clear_buckets();
        self.fallback.reset();
        self.flushed = false;
    }

    fn push(&mut self, ban: Ban) {
        if self.flushed {
            self.fallback.push(ban);
        } else {
            self.incoming.push(ban);
        }
    }

    fn propagate(&mut self, wave: &mut Wave, ctx: PropagationContext<'_>) -> Result<usize, Contradiction> {
        let mut cascaded = 0;
        if !self.flushed && self.incoming.len() > self.threshold {
            self.flushed = true;
            cascaded += self.flush(wave, ctx)?;
        } else {
            self.fallback.extend(self.incoming.drain(..));
        }
        cascaded += self.fallback.propagate(wave, ctx)?;
        Ok(cascaded)
    }
}

/// Spreads one phase's bans in parallel and returns the bans they caused.
fn run_phase(wave: &mut Wave, mut bans: Vec<Ban>, ctx: PropagationContext<'_>) -> Result<Vec<Ban>, Contradiction> {
    bans.sort_unstable_by_key(|ban| ban.cell);
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for ban in bans {
        match groups.last_mut() {
            Some((cell, blocks)) if *cell == ban.cell => blocks.push(ban.block),
            _ => groups.push((ban.cell, vec![ban.block])),
        }
    }

    let mut owners: HashMap<usize, (usize, usize)> = HashMap::new();
    let neighbour_ids: Vec<[Option<usize>; DIRECTION_COUNT]> = groups
        .iter()
        .enumerate()
        .map(|(task, (cell, _))| {
            Direction::ALL.map(|direction| {
                let neighbour = wave.neighbour(*cell, direction)?;
                owners.insert(neighbour, (task, direction.index()));
                Some(neighbour)
            })
        })
        .collect();

    let mut slots: Vec<[Option<&mut CellWave>; DIRECTION_COUNT]> =
        (0..groups.len()).map(|_| Default::default()).collect();
    for (index, cell) in wave.cells_mut().iter_mut().enumerate() {
        if let Some(&(task, slot)) = owners.get(&index) {
            slots[task][slot] = Some(cell);
        }
    }

    let results: Vec<Result<Vec<Ban>, Contradiction>> = groups
        .into_par_iter()
        .zip(slots.into_par_iter())
        .zip(neighbour_ids.into_par_iter())
        .map(|(((_, blocks), mut cells), ids)| {
            let mut produced = Vec::new();
            for &banned in &blocks {
                for direction in Direction::ALL {
                    let slot = direction.index();
                    let (Some(cell), Some(id)) = (cells[slot].as_deref_mut(), ids[slot]) else {
                        continue;
                    };
                    if cell.retract(id, direction.opposite(), banned, ctx.catalog, ctx.weights, &mut produced) {
                        return Err(Contradiction { cell: id });
                    }
                }
            }
            Ok(produced)
        })
        .collect();

    let mut produced = Vec::new();
    for result in results {
        produced.extend(result?);
    }
    Ok(produced)
}
