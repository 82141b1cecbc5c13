//! Cell selection and weighted collapse.

use crate::wave::{CellWave, Wave};
use float_ord::FloatOrd;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use wfc_catalog::BlockWeights;

/// Jitter added to entropies to break ties randomly.
const ENTROPY_NOISE: f64 = 1e-6;

/// Outcome of scanning the wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Every cell holds exactly one candidate.
    Resolved,
    /// This cell has no usable candidate left.
    Contradiction(usize),
    /// The unresolved cell with the lowest entropy.
    Collapse(usize),
}

/// Finds the next cell to collapse.
///
/// A cell whose remaining candidates all weigh zero counts as a
/// contradiction, resolved or not.
pub fn observe<R: Rng + ?Sized>(wave: &Wave, rng: &mut R) -> Observation {
    let mut best: Option<(FloatOrd<f64>, usize)> = None;
    for (index, cell) in wave.cells().iter().enumerate() {
        if cell.remaining() == 0 || cell.weighted_remaining() == 0 {
            return Observation::Contradiction(index);
        }
        if cell.remaining() == 1 {
            continue;
        }
        let entropy = FloatOrd(cell.weight_sum().ln() + rng.gen::<f64>() * ENTROPY_NOISE);
        if best.map_or(true, |(lowest, _)| entropy < lowest) {
            best = Some((entropy, index));
        }
    }
    match best {
        Some((_, index)) => Observation::Collapse(index),
        None => Observation::Resolved,
    }
}

/// Picks a candidate of `cell`, keeping placements proportional to weight.
///
/// A candidate is eligible while `(placed + 1) / volume < weight / total`.
/// When nothing is eligible the pick ignores the quotas.
pub fn stable_pick<R: Rng + ?Sized>(
    cell: &CellWave,
    weights: &BlockWeights,
    placed: &[u32],
    volume: usize,
    rng: &mut R,
) -> Option<usize> {
    let total = weights.total();
    if total > 0.0 && volume > 0 {
        let eligible: Vec<usize> = cell
            .candidates()
            .filter(|&block| {
                let share = f64::from(weights.weight(block)) / total;
                let used = f64::from(placed[block] + 1) / volume as f64;
                weights.weight(block) > 0.0 && used < share
            })
            .collect();
        if let Some(block) = roulette(&eligible, weights, rng) {
            return Some(block);
        }
    }
    pick(cell, weights, rng)
}

/// Plain weighted pick among all remaining candidates.
pub fn pick<R: Rng + ?Sized>(cell: &CellWave, weights: &BlockWeights, rng: &mut R) -> Option<usize> {
    let candidates: Vec<usize> = cell.candidates().collect();
    roulette(&candidates, weights, rng)
}

fn roulette<R: Rng + ?Sized>(candidates: &[usize], weights: &BlockWeights, rng: &mut R) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let distribution = WeightedIndex::new(candidates.iter().map(|&block| weights.weight(block))).ok()?;
    Some(candidates[distribution.sample(rng)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use wfc_catalog::{
        BlockDescriptor, Catalog, LayerDescriptor, RepositoryDescriptor, EMPTY_BLOCK, SOLID_BLOCK,
    };

    fn cell_with(weights: &BlockWeights) -> CellWave {
        let mut cell = CellWave::default();
        cell.reset(weights.len());
        for block in 0..weights.len() {
            cell.admit(block, [1; 6], weights.weight(block));
        }
        cell
    }

    #[test]
    fn zero_weight_is_never_picked() {
        let repository = RepositoryDescriptor {
            weight_groups: vec!["Rare".to_owned()],
            layers: vec![LayerDescriptor {
                blocks: vec![BlockDescriptor {
                    name: "slab".to_owned(),
                    mesh: Some("slab.obj".to_owned()),
                    fill: 0x33,
                    weight_group: Some("Rare".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let catalog = Catalog::compile(&repository).unwrap();
        let mut weights = catalog.default_weights();
        weights.override_weight_groups(&[-1.0, 0.0]);
        let cell = cell_with(&weights);
        let placed = vec![0; weights.len()];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let picked = pick(&cell, &weights, &mut rng).unwrap();
            assert!(picked == EMPTY_BLOCK || picked == SOLID_BLOCK);
            let stable = stable_pick(&cell, &weights, &placed, 8, &mut rng).unwrap();
            assert!(stable == EMPTY_BLOCK || stable == SOLID_BLOCK);
        }
    }

    #[test]
    fn stable_pick_prefers_under_quota_blocks() {
        let weights = Catalog::builtin().default_weights();
        let cell = cell_with(&weights);
        // Each block may fill half the volume; Empty already has its share.
        let placed = [2, 0];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert_eq!(stable_pick(&cell, &weights, &placed, 4, &mut rng), Some(SOLID_BLOCK));
        }
    }

    #[test]
    fn stable_pick_falls_back_when_all_over_quota() {
        let weights = Catalog::builtin().default_weights();
        let cell = cell_with(&weights);
        let placed = [5, 5];
        let mut rng = StdRng::seed_from_u64(5);
        assert!(stable_pick(&cell, &weights, &placed, 4, &mut rng).is_some());
    }

    #[test]
    fn observe_reports_contradiction_and_resolution() {
        let weights = Catalog::builtin().default_weights();
        let mut wave = Wave::with_capacity([2, 1, 1]);
        wave.reset([2, 1, 1], weights.len());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(observe(&wave, &mut rng), Observation::Contradiction(0));

        for index in 0..2 {
            let cell = wave.cell_mut(index);
            cell.admit(EMPTY_BLOCK, [1; 6], 1.0);
            cell.admit(SOLID_BLOCK, [1; 6], 1.0);
        }
        assert!(matches!(observe(&wave, &mut rng), Observation::Collapse(_)));

        for index in 0..2 {
            wave.cell_mut(index).ban(SOLID_BLOCK, 1.0);
        }
        assert_eq!(observe(&wave, &mut rng), Observation::Resolved);
    }
}
