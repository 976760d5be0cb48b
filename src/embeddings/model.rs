// model.rs: Two-input skip-gram classifier over a shared embedding table.
//
// logit(t, c) = a * cos(E[t], E[c]) + b,   p = sigmoid(logit)
//
// E is the (V+1, D) table, a and b are learned scalars. Row 0 (OOV) exists so ids
// index the table directly but never appears in a training pair.

use anyhow::bail;
use candle_core::{DType, Device, Tensor, Var};
use rand::Rng;

use crate::config;

pub struct SkipGramModel {
    table: Var,
    scale: Var,
    bias: Var,
}

impl SkipGramModel {
    /// Uniform init in `[-INIT_RANGE, INIT_RANGE)`, scale 1, bias 0.
    pub fn new<R: Rng + ?Sized>(rows: usize, dims: usize, rng: &mut R, device: &Device) -> anyhow::Result<Self> {
        if rows == 0 || dims == 0 {
            bail!("embedding table must be non-empty (got {rows}x{dims})");
        }
        let range = config::training::INIT_RANGE;
        let data: Vec<f32> = (0..rows * dims).map(|_| rng.gen_range(-range..range)).collect();

        let table = Var::from_tensor(&Tensor::from_vec(data, (rows, dims), device)?)?;
        let scale = Var::from_tensor(&Tensor::ones((1,), DType::F32, device)?)?;
        let bias = Var::from_tensor(&Tensor::zeros((1,), DType::F32, device)?)?;

        log::info!("Initialized embedding table {}x{}", rows, dims);
        Ok(Self { table, scale, bias })
    }

    /// All trainable variables, for the optimizer.
    pub fn vars(&self) -> Vec<Var> {
        vec![self.table.clone(), self.scale.clone(), self.bias.clone()]
    }

    pub fn table(&self) -> &Tensor {
        self.table.as_tensor()
    }

    pub fn dims(&self) -> anyhow::Result<(usize, usize)> {
        Ok(self.table.as_tensor().dims2()?)
    }

    /// Logits for a batch. `targets` and `contexts` are `u32` tensors of shape `[B]`;
    /// the result has shape `[B]`.
    pub fn logits(&self, targets: &Tensor, contexts: &Tensor) -> anyhow::Result<Tensor> {
        let t = self.table.as_tensor().index_select(targets, 0)?;
        let c = self.table.as_tensor().index_select(contexts, 0)?;
        let cos = cosine_similarity(&t, &c)?;
        Ok(cos
            .broadcast_mul(self.scale.as_tensor())?
            .broadcast_add(self.bias.as_tensor())?)
    }
}

/// Row-wise cosine similarity of two `[B, D]` tensors → `[B]`.
pub fn cosine_similarity(a: &Tensor, b: &Tensor) -> anyhow::Result<Tensor> {
    let dot = a.mul(b)?.sum(1)?;
    let norm_a = a.sqr()?.sum(1)?.sqrt()?;
    let norm_b = b.sqr()?.sum(1)?.sqrt()?;
    let denom = norm_a.mul(&norm_b)?.affine(1.0, config::training::COSINE_EPS)?;
    Ok(dot.div(&denom)?)
}

/// Mean binary cross-entropy on logits, in the overflow-safe form
/// `max(x, 0) - x*y + ln(1 + exp(-|x|))`.
pub fn bce_with_logits(logits: &Tensor, labels: &Tensor) -> anyhow::Result<Tensor> {
    let positive_part = logits.relu()?;
    let xy = logits.mul(labels)?;
    let log_term = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    Ok(positive_part.sub(&xy)?.add(&log_term)?.mean_all()?)
}
