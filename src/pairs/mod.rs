// pairs/: Skip-gram training pair generation.
//
// Provides:
// - Target subsampling tables (frequency- or rank-based keep probabilities)
// - Frequency-weighted negative context distribution
// - The windowed skip-gram sampler itself

pub mod negative;
pub mod skipgram;
pub mod subsample;

use std::fmt::Write as _;
use std::path::Path;

use crate::corpus;

pub use skipgram::SkipGramSampler;

/// One training example. `label` is 1 when `context` occurred within the window of
/// `target`, 0 for a negative sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkipGramPair {
    pub target: u32,
    pub context: u32,
    pub label: u8,
}

impl SkipGramPair {
    pub fn positive(target: u32, context: u32) -> Self {
        Self { target, context, label: 1 }
    }

    pub fn negative(target: u32, context: u32) -> Self {
        Self { target, context, label: 0 }
    }

    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}

/// `(positives, negatives)` in a pair list.
pub fn label_counts(pairs: &[SkipGramPair]) -> (usize, usize) {
    let positives = pairs.iter().filter(|p| p.is_positive()).count();
    (positives, pairs.len() - positives)
}

/// Write pairs as `target<TAB>context<TAB>label` lines.
pub fn write_pairs(path: &Path, pairs: &[SkipGramPair]) -> anyhow::Result<()> {
    let mut body = String::with_capacity(pairs.len() * 16);
    for p in pairs {
        writeln!(body, "{}\t{}\t{}", p.target, p.context, p.label)?;
    }
    corpus::write_atomic(path, body.as_bytes())?;
    log::info!("Wrote {} pairs to {}", pairs.len(), path.display());
    Ok(())
}
