use crate::catalog::Catalog;
use log::{debug, warn};

/// Per-block selection weights with cached group and total sums.
///
/// Starts from the authored weights of a [`Catalog`]. Overrides always apply
/// on top of the authored values, so passing a negative value for a weight
/// group restores its authored weights.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockWeights {
    authored: Vec<f32>,
    weights: Vec<f32>,
    weight_group_of: Vec<usize>,
    group_of: Vec<usize>,
    weight_group_count: usize,
    group_sums: Vec<f64>,
    total: f64,
}

impl BlockWeights {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let authored: Vec<f32> = catalog.blocks().iter().map(|b| b.weight).collect();
        let mut weights = Self {
            weights: authored.clone(),
            authored,
            weight_group_of: catalog.blocks().iter().map(|b| b.weight_group).collect(),
            group_of: catalog.blocks().iter().map(|b| b.group).collect(),
            weight_group_count: catalog.weight_group_count(),
            group_sums: vec![0.0; catalog.group_count()],
            total: 0.0,
        };
        weights.recompute_sums();
        weights
    }

    fn recompute_sums(&mut self) {
        self.group_sums.iter_mut().for_each(|s| *s = 0.0);
        for (&weight, &group) in self.weights.iter().zip(&self.group_of) {
            if let Some(sum) = self.group_sums.get_mut(group) {
                *sum += f64::from(weight);
            }
        }
        self.total = self.group_sums.iter().sum();
    }

    /// Sets every block of each weight group to the given value. A negative
    /// entry keeps the authored weights of that group; missing entries count as
    /// negative.
    pub fn override_weight_groups(&mut self, overrides: &[f32]) {
        if overrides.len() > self.weight_group_count {
            warn!(
                "{} weight overrides given for {} weight groups, extra values ignored",
                overrides.len(),
                self.weight_group_count
            );
        }
        for (block, weight) in self.weights.iter_mut().enumerate() {
            let group = self.weight_group_of[block];
            *weight = match overrides.get(group) {
                Some(&value) if value >= 0.0 && value.is_finite() => value,
                _ => self.authored[block],
            };
        }
        self.recompute_sums();
        debug!("Weight overrides applied, total weight {:.3}", self.total);
    }

    /// Drops all overrides.
    pub fn reset(&mut self) {
        self.weights.clone_from(&self.authored);
        self.recompute_sums();
    }

    #[inline]
    pub fn weight(&self, block: usize) -> f32 {
        self.weights[block]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    /// Sum of the weights of a group's blocks.
    pub fn group_sum(&self, group: usize) -> f64 {
        self.group_sums.get(group).copied().unwrap_or(0.0)
    }

    /// Sum of all block weights.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
