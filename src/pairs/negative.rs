use anyhow::Context;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::sampling::NEGATIVE_DISTRIBUTION_POWER;

/// Distribution over real ids `1..=V` used to substitute negative contexts.
///
/// Weights are `count^0.75`, so frequent words are drawn more often but less than
/// proportionally. When nothing in the vocabulary was observed the draw is uniform.
#[derive(Debug, Clone)]
pub struct NegativeTable {
    dist: WeightedIndex<f64>,
}

impl NegativeTable {
    /// `counts` is indexed by id; slot 0 (OOV) is never drawn.
    pub fn from_counts(counts: &[u64]) -> anyhow::Result<Self> {
        let mut weights: Vec<f64> = counts
            .iter()
            .skip(1)
            .map(|&c| (c as f64).powf(NEGATIVE_DISTRIBUTION_POWER))
            .collect();
        if weights.iter().all(|&w| w == 0.0) {
            weights.iter_mut().for_each(|w| *w = 1.0);
        }
        let dist = WeightedIndex::new(&weights).context("build negative sampling distribution")?;
        Ok(Self { dist })
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.dist.sample(rng) as u32 + 1
    }
}
