// manifest.rs: Record of a training run written next to its outputs.
//
// Holds the effective config, corpus/vocabulary sizes, per-epoch stats and SHA256
// checksums of the output files, so a table can be checked against the run that
// produced it.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{self, PipelineConfig};
use crate::corpus;
use crate::embeddings::train::EpochStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool_version: String,
    pub created_at: String,
    pub config: PipelineConfig,
    pub vocab_size: usize,
    pub embedding_dims: usize,
    pub tokens: usize,
    pub oov_tokens: usize,
    pub epochs: Vec<EpochStats>,
    pub word_index_sha256: String,
    pub embeddings_sha256: String,
}

impl RunManifest {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let body = serde_json::to_vec_pretty(self).context("failed serializing manifest")?;
        corpus::write_atomic(path, &body)?;
        log::info!("Wrote run manifest to {}", path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("invalid manifest {}", path.display()))
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Lowercase hex SHA256 of a file's contents.
pub fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&body);
    Ok(hex::encode(hasher.finalize()))
}

/// If a manifest sits next to `embeddings_path`, check the file against it.
/// Returns whether a manifest was found.
pub fn verify_embeddings(embeddings_path: &Path) -> anyhow::Result<bool> {
    let manifest_path = embeddings_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(config::output::MANIFEST_FILE);
    if !manifest_path.exists() {
        log::debug!("No manifest at {}, skipping checksum", manifest_path.display());
        return Ok(false);
    }

    let manifest = RunManifest::read(&manifest_path)?;
    let actual_hash = sha256_file(embeddings_path)?;
    if actual_hash != manifest.embeddings_sha256 {
        let filename = embeddings_path.file_name().unwrap_or_default().to_string_lossy();
        bail!(
            "SHA256 mismatch for {}: expected {}, got {}",
            filename,
            manifest.embeddings_sha256,
            actual_hash
        );
    }

    log::info!(
        "SHA256 verified for {} ({})",
        embeddings_path.display(),
        &actual_hash[..12]
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest(embeddings_sha256: String) -> RunManifest {
        RunManifest {
            tool_version: config::TOOL_VERSION.to_string(),
            created_at: now_rfc3339(),
            config: PipelineConfig::default(),
            vocab_size: 2,
            embedding_dims: 4,
            tokens: 10,
            oov_tokens: 1,
            epochs: vec![EpochStats {
                epoch: 1,
                positives: 8,
                negatives: 8,
                mean_loss: 0.69,
                accuracy: 0.5,
            }],
            word_index_sha256: String::new(),
            embeddings_sha256,
        }
    }

    #[test]
    fn test_sha256_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::output::MANIFEST_FILE);
        let manifest = sample_manifest("00".repeat(32));
        manifest.write(&path).unwrap();
        assert_eq!(RunManifest::read(&path).unwrap(), manifest);
    }

    #[test]
    fn test_verify_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let emb = dir.path().join(config::output::EMBEDDINGS_FILE);
        fs::write(&emb, b"table bytes").unwrap();

        // No manifest yet: nothing to verify.
        assert!(!verify_embeddings(&emb).unwrap());

        let manifest_path = dir.path().join(config::output::MANIFEST_FILE);
        sample_manifest(sha256_file(&emb).unwrap()).write(&manifest_path).unwrap();
        assert!(verify_embeddings(&emb).unwrap());

        fs::write(&emb, b"tampered").unwrap();
        let err = verify_embeddings(&emb).unwrap_err();
        assert!(err.to_string().contains("SHA256 mismatch"));
    }
}
