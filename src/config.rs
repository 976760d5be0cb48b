use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric values scattered around).

// NOTE: TOOL_VERSION must stay in sync with the `version` field in Cargo.toml.
pub const TOOL_VERSION: &str = "0.1.0";

pub mod logging {
    pub const LOG_DIR_REL: &str = ".corpus-vectors/logs";
    pub const LOG_FILE_NAME: &str = "corpus_vectors";

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;
}

pub mod vocab {
    /// Reserved id for tokens that are not in the type list.
    pub const OOV_ID: u32 = 0;
}

pub mod sampling {
    pub const WINDOW_SIZE: usize = 4;

    // Negatives per positive. 1.0 keeps the classes balanced.
    pub const NEGATIVE_RATIO: f64 = 1.0;

    pub const SUBSAMPLING_THRESHOLD: f64 = 1e-5;

    // Unigram^0.75 smoothing for frequency-weighted negative contexts.
    pub const NEGATIVE_DISTRIBUTION_POWER: f64 = 0.75;

    // Redraws before a negative that keeps colliding with a positive is dropped.
    pub const MAX_NEGATIVE_REDRAWS: usize = 8;

    // Euler-Mascheroni constant, used by the rank-based (Zipf) keep table.
    pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
}

pub mod training {
    pub const EMBEDDING_DIMS: usize = 100;
    pub const EPOCHS: usize = 5;
    pub const BATCH_SIZE: usize = 1024;
    pub const LEARNING_RATE: f64 = 0.01;

    // Uniform init range for the embedding table: [-INIT_RANGE, INIT_RANGE).
    pub const INIT_RANGE: f32 = 0.05;

    // Guards the cosine denominator for all-zero rows.
    pub const COSINE_EPS: f64 = 1e-8;

    pub const DEFAULT_NEIGHBORS: usize = 10;
}

pub mod output {
    pub const WORD_INDEX_FILE: &str = "word_index.tsv";
    pub const EMBEDDINGS_FILE: &str = "embeddings.safetensors";
    pub const MANIFEST_FILE: &str = "manifest.json";

    /// Tensor name inside the safetensors file.
    pub const EMBEDDINGS_TENSOR: &str = "embeddings";
}

/// How the per-id keep probabilities for target subsampling are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsamplingMode {
    /// From observed id counts in the token sequence.
    Frequency,
    /// From the id itself, assuming the type list is sorted by descending frequency.
    Rank,
    None,
}

/// Effective settings for one run. Loaded from an optional JSON file, then
/// overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub negative_ratio: f64,
    pub subsampling: SubsamplingMode,
    pub subsampling_threshold: f64,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub embedding_dims: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: sampling::WINDOW_SIZE,
            negative_ratio: sampling::NEGATIVE_RATIO,
            subsampling: SubsamplingMode::Frequency,
            subsampling_threshold: sampling::SUBSAMPLING_THRESHOLD,
            shuffle: true,
            seed: None,
            embedding_dims: training::EMBEDDING_DIMS,
            epochs: training::EPOCHS,
            batch_size: training::BATCH_SIZE,
            learning_rate: training::LEARNING_RATE,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size == 0 {
            bail!("window_size must be at least 1");
        }
        if !(self.negative_ratio >= 0.0) {
            bail!("negative_ratio must be >= 0 (got {})", self.negative_ratio);
        }
        if self.subsampling != SubsamplingMode::None && !(self.subsampling_threshold > 0.0) {
            bail!(
                "subsampling_threshold must be > 0 (got {})",
                self.subsampling_threshold
            );
        }
        if self.embedding_dims == 0 {
            bail!("embedding_dims must be at least 1");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning_rate must be > 0 (got {})", self.learning_rate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.window_size, 4);
        assert_eq!(cfg.subsampling, SubsamplingMode::Frequency);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"window_size": 2, "subsampling": "rank", "seed": 7}"#).unwrap();
        assert_eq!(cfg.window_size, 2);
        assert_eq!(cfg.subsampling, SubsamplingMode::Rank);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.epochs, training::EPOCHS);
        assert_eq!(cfg.batch_size, training::BATCH_SIZE);
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let bad = [
            PipelineConfig { window_size: 0, ..Default::default() },
            PipelineConfig { negative_ratio: -1.0, ..Default::default() },
            PipelineConfig { embedding_dims: 0, ..Default::default() },
            PipelineConfig { epochs: 0, ..Default::default() },
            PipelineConfig { batch_size: 0, ..Default::default() },
            PipelineConfig { learning_rate: 0.0, ..Default::default() },
            PipelineConfig { subsampling_threshold: 0.0, ..Default::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }

        // Threshold is irrelevant when subsampling is off.
        let off = PipelineConfig {
            subsampling: SubsamplingMode::None,
            subsampling_threshold: 0.0,
            ..Default::default()
        };
        off.validate().unwrap();
    }
}
