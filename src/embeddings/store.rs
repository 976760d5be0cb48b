use std::path::Path;

use anyhow::{bail, Context};
use candle_core::{DType, Device, Tensor};

use crate::config::output::EMBEDDINGS_TENSOR;

/// Save the `[V+1, D]` table as a single-tensor safetensors file.
pub fn save_embeddings(table: &Tensor, path: &Path) -> anyhow::Result<()> {
    let (rows, dims) = table.dims2().context("embedding table must be 2-D")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir {}", parent.display()))?;
    }

    // Write atomically: write to .tmp, then rename
    let tmp_path = path.with_extension("tmp");
    table
        .to_dtype(DType::F32)?
        .save_safetensors(EMBEDDINGS_TENSOR, &tmp_path)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), path.display()))?;

    log::info!("Wrote embeddings {}x{} to {}", rows, dims, path.display());
    Ok(())
}

/// Load a table written by [`save_embeddings`].
pub fn load_embeddings(path: &Path, device: &Device) -> anyhow::Result<Tensor> {
    let mut tensors = candle_core::safetensors::load(path, device)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let Some(table) = tensors.remove(EMBEDDINGS_TENSOR) else {
        bail!("{} has no '{}' tensor", path.display(), EMBEDDINGS_TENSOR);
    };
    if table.dtype() != DType::F32 {
        bail!("{}: expected F32 embeddings, got {:?}", path.display(), table.dtype());
    }
    let (rows, dims) = table
        .dims2()
        .with_context(|| format!("{}: embeddings must be 2-D", path.display()))?;
    log::info!("Loaded embeddings {}x{} from {}", rows, dims, path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_is_bit_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.safetensors");

        // Include values that are easy to perturb: tiny, negative zero, large.
        let data: Vec<f32> = vec![0.0, -0.0, 1e-38, -3.25, 0.1, 7.0e30, f32::MIN_POSITIVE, -1.5e-7, 42.0];
        let table = Tensor::from_vec(data.clone(), (3, 3), &Device::Cpu).unwrap();
        save_embeddings(&table, &path).unwrap();

        let loaded = load_embeddings(&path, &Device::Cpu).unwrap();
        assert_eq!(loaded.dims(), &[3, 3]);
        let got: Vec<f32> = loaded.flatten_all().unwrap().to_vec1().unwrap();
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&got), bits(&data));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_tensor_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.safetensors");
        let t = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        t.save_safetensors("weights", &path).unwrap();

        let err = load_embeddings(&path, &Device::Cpu).unwrap_err();
        assert!(err.to_string().contains("no 'embeddings' tensor"));
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_embeddings(Path::new("/nope/embeddings.safetensors"), &Device::Cpu).is_err());
    }
}
