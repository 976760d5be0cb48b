use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::sampling::MAX_NEGATIVE_REDRAWS;
use crate::config::vocab::OOV_ID;
use crate::config::PipelineConfig;
use crate::pairs::negative::NegativeTable;
use crate::pairs::subsample::SubsamplingTable;
use crate::pairs::SkipGramPair;
use crate::pipeline::PipelineContext;

/// Windowed skip-gram pair generator with target subsampling and
/// frequency-weighted negative sampling.
///
/// One sampler owns one RNG: constructing it with a seed makes every
/// subsequent `sample` call reproducible in sequence.
pub struct SkipGramSampler {
    window: usize,
    negative_ratio: f64,
    shuffle: bool,
    subsampling: Option<SubsamplingTable>,
    negatives: NegativeTable,
    // Every (a, b) within `window` anywhere in the corpus, both directions.
    cooccurring: HashSet<(u32, u32)>,
    rng: StdRng,
}

impl SkipGramSampler {
    pub fn new(ctx: &PipelineContext, cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            window: cfg.window_size,
            negative_ratio: cfg.negative_ratio,
            shuffle: cfg.shuffle,
            subsampling: SubsamplingTable::for_context(cfg.subsampling, ctx, cfg.subsampling_threshold),
            negatives: NegativeTable::from_counts(&ctx.id_counts())?,
            cooccurring: cooccurring_pairs(&ctx.sequence, cfg.window_size),
            rng,
        })
    }

    /// Whether the corpus yields any positive pair before subsampling.
    pub fn has_positives(&self) -> bool {
        !self.cooccurring.is_empty()
    }

    /// Generate positives and negatives for `sequence`.
    ///
    /// Positives: every non-OOV id within `window` positions of a kept, non-OOV
    /// target (clipped at both ends). Negatives: positive targets paired with a
    /// drawn context that never co-occurs with them.
    pub fn sample(&mut self, sequence: &[u32]) -> Vec<SkipGramPair> {
        let mut pairs = Vec::new();
        let mut skipped_targets = 0usize;

        for (i, &target) in sequence.iter().enumerate() {
            if target == OOV_ID {
                continue;
            }
            if let Some(table) = &self.subsampling {
                if self.rng.gen::<f32>() >= table.keep_probability(target) {
                    skipped_targets += 1;
                    continue;
                }
            }
            let start = i.saturating_sub(self.window);
            let end = (i + self.window + 1).min(sequence.len());
            for (j, &context) in sequence.iter().enumerate().take(end).skip(start) {
                if j == i || context == OOV_ID {
                    continue;
                }
                pairs.push(SkipGramPair::positive(target, context));
            }
        }

        let positives = pairs.len();
        let dropped = self.push_negatives(&mut pairs);

        if self.shuffle {
            pairs.shuffle(&mut self.rng);
        }

        log::info!(
            "Sampled {} pairs ({} positive, {} negative; {} targets subsampled away, {} negatives dropped)",
            pairs.len(),
            positives,
            pairs.len() - positives,
            skipped_targets,
            dropped
        );
        pairs
    }

    /// Append negatives for the positives already in `pairs`. Returns how many were
    /// dropped because every draw collided with a co-occurring context.
    fn push_negatives(&mut self, pairs: &mut Vec<SkipGramPair>) -> usize {
        if pairs.is_empty() {
            return 0;
        }

        // `sequence` may differ from the corpus the sampler was built on.
        let local: HashSet<(u32, u32)> = pairs
            .iter()
            .flat_map(|p| [(p.target, p.context), (p.context, p.target)])
            .collect();

        let mut targets: Vec<u32> = pairs.iter().map(|p| p.target).collect();
        targets.shuffle(&mut self.rng);

        let num_negative = (pairs.len() as f64 * self.negative_ratio).round() as usize;
        let mut dropped = 0usize;
        for k in 0..num_negative {
            let target = targets[k % targets.len()];
            let context = (0..MAX_NEGATIVE_REDRAWS)
                .map(|_| self.negatives.draw(&mut self.rng))
                .find(|&c| !self.cooccurring.contains(&(target, c)) && !local.contains(&(target, c)));
            match context {
                Some(context) => pairs.push(SkipGramPair::negative(target, context)),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            log::debug!("Dropped {} negatives after {} redraws each", dropped, MAX_NEGATIVE_REDRAWS);
        }
        dropped
    }
}

/// Every ordered pair of non-OOV ids at most `window` positions apart, ignoring
/// subsampling. Symmetric by construction.
fn cooccurring_pairs(sequence: &[u32], window: usize) -> HashSet<(u32, u32)> {
    let mut set = HashSet::new();
    for (i, &a) in sequence.iter().enumerate() {
        if a == OOV_ID {
            continue;
        }
        let end = (i + window + 1).min(sequence.len());
        for &b in &sequence[i + 1..end] {
            if b != OOV_ID {
                set.insert((a, b));
                set.insert((b, a));
            }
        }
    }
    set
}
