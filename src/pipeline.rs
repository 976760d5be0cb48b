use std::path::Path;

use anyhow::bail;

use crate::config::vocab::OOV_ID;
use crate::corpus;
use crate::vocab::Vocabulary;

/// Everything a run derives from its input files. Built once, then handed to the
/// sampler and trainer by reference.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub vocab: Vocabulary,
    pub sequence: Vec<u32>,
    pub oov_tokens: usize,
}

impl PipelineContext {
    pub fn new<S: AsRef<str>>(vocab: Vocabulary, tokens: &[S]) -> anyhow::Result<Self> {
        if vocab.is_empty() {
            bail!("type list is empty");
        }
        let sequence = vocab.encode(tokens);
        let oov_tokens = sequence.iter().filter(|&&id| id == OOV_ID).count();
        Ok(Self {
            vocab,
            sequence,
            oov_tokens,
        })
    }

    pub fn from_files(tokens_path: &Path, types_path: &Path) -> anyhow::Result<Self> {
        let types = corpus::read_list(types_path)?;
        let vocab = Vocabulary::from_types(types);
        log::info!("Vocabulary: {} types from {}", vocab.len(), types_path.display());

        let tokens = corpus::read_list(tokens_path)?;
        let ctx = Self::new(vocab, &tokens)?;
        log::info!(
            "Token sequence: {} tokens from {} ({} OOV, {:.2}%)",
            ctx.sequence.len(),
            tokens_path.display(),
            ctx.oov_tokens,
            ctx.oov_percent()
        );
        Ok(ctx)
    }

    /// Occurrences of each id in the sequence, indexed by id (slot 0 counts OOV).
    pub fn id_counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.vocab.table_rows()];
        for &id in &self.sequence {
            counts[id as usize] += 1;
        }
        counts
    }

    fn oov_percent(&self) -> f64 {
        if self.sequence.is_empty() {
            0.0
        } else {
            self.oov_tokens as f64 * 100.0 / self.sequence.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_counts_oov() {
        let vocab = Vocabulary::from_types(["a", "b"]);
        let ctx = PipelineContext::new(vocab, &["a", "c", "b", "a", "zz"]).unwrap();
        assert_eq!(ctx.sequence, vec![1, 0, 2, 1, 0]);
        assert_eq!(ctx.oov_tokens, 2);
        assert_eq!(ctx.id_counts(), vec![2, 2, 1]);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let empty: [&str; 0] = [];
        let err = PipelineContext::new(Vocabulary::from_types(empty), &["a"]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let types = dir.path().join("types.txt");
        let tokens = dir.path().join("tokens.txt");
        std::fs::write(&types, "ic\nhine\n").unwrap();
        std::fs::write(&tokens, "ic\ngeseah\nhine\n").unwrap();

        let ctx = PipelineContext::from_files(&tokens, &types).unwrap();
        assert_eq!(ctx.sequence, vec![1, 0, 2]);
    }
}
