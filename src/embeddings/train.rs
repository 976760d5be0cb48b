// train.rs: Epoch loop: sample pairs, batch them, step the optimizer.
//
// Pairs are regenerated every epoch so each pass sees fresh negatives and a fresh
// subsampling draw.

use anyhow::{bail, Context};
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::embeddings::model::{bce_with_logits, SkipGramModel};
use crate::pairs::{label_counts, SkipGramPair, SkipGramSampler};
use crate::pipeline::PipelineContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub positives: usize,
    pub negatives: usize,
    pub mean_loss: f32,
    pub accuracy: f32,
}

/// Owns the model and its optimizer for one run.
pub struct Trainer {
    model: SkipGramModel,
    optimizer: AdamW,
    batch_size: usize,
    device: Device,
}

impl Trainer {
    pub fn new(model: SkipGramModel, cfg: &PipelineConfig, device: Device) -> anyhow::Result<Self> {
        let params = ParamsAdamW {
            lr: cfg.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let optimizer = AdamW::new(model.vars(), params).context("create optimizer")?;
        Ok(Self {
            model,
            optimizer,
            batch_size: cfg.batch_size,
            device,
        })
    }

    /// One pass over `pairs`, one optimizer step per batch.
    pub fn run_epoch(&mut self, epoch: usize, pairs: &[SkipGramPair]) -> anyhow::Result<EpochStats> {
        if pairs.is_empty() {
            bail!("no training pairs (is every token out of vocabulary?)");
        }

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        for batch in pairs.chunks(self.batch_size) {
            let (loss, batch_correct) = self.step(batch)?;
            loss_sum += loss as f64 * batch.len() as f64;
            correct += batch_correct;
        }

        let (positives, negatives) = label_counts(pairs);
        let stats = EpochStats {
            epoch,
            positives,
            negatives,
            mean_loss: (loss_sum / pairs.len() as f64) as f32,
            accuracy: correct as f32 / pairs.len() as f32,
        };
        log::info!(
            "Epoch {}: {} pairs, loss {:.4}, accuracy {:.3}",
            epoch,
            pairs.len(),
            stats.mean_loss,
            stats.accuracy
        );
        Ok(stats)
    }

    /// Returns the batch loss and how many predictions matched their label.
    fn step(&mut self, batch: &[SkipGramPair]) -> anyhow::Result<(f32, usize)> {
        let n = batch.len();
        let targets: Vec<u32> = batch.iter().map(|p| p.target).collect();
        let contexts: Vec<u32> = batch.iter().map(|p| p.context).collect();
        let labels: Vec<f32> = batch.iter().map(|p| p.label as f32).collect();

        let targets = Tensor::from_vec(targets, (n,), &self.device)?;
        let contexts = Tensor::from_vec(contexts, (n,), &self.device)?;
        let labels_t = Tensor::from_vec(labels.clone(), (n,), &self.device)?;

        let logits = self.model.logits(&targets, &contexts)?;
        let loss = bce_with_logits(&logits, &labels_t)?;
        self.optimizer.backward_step(&loss)?;

        // sigmoid(x) > 0.5 exactly when x > 0.
        let predicted: Vec<f32> = logits.to_vec1()?;
        let correct = predicted
            .iter()
            .zip(&labels)
            .filter(|(x, y)| (**x > 0.0) == (**y > 0.5))
            .count();

        Ok((loss.to_scalar::<f32>()?, correct))
    }

    pub fn into_model(self) -> SkipGramModel {
        self.model
    }
}

/// Sample and train for `cfg.epochs` epochs on the context's sequence.
pub fn train(ctx: &PipelineContext, cfg: &PipelineConfig) -> anyhow::Result<(SkipGramModel, Vec<EpochStats>)> {
    cfg.validate()?;
    let device = Device::Cpu;

    // Init draws from its own stream so changing the sampler never shifts the
    // initial table for a fixed seed.
    let mut init_rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let model = SkipGramModel::new(ctx.vocab.table_rows(), cfg.embedding_dims, &mut init_rng, &device)?;

    let mut sampler = SkipGramSampler::new(ctx, cfg)?;
    if !sampler.has_positives() {
        bail!("no training pairs (is every token out of vocabulary?)");
    }
    let mut trainer = Trainer::new(model, cfg, device)?;

    log::info!(
        "Training: {} epochs, batch size {}, learning rate {}, window {}",
        cfg.epochs,
        cfg.batch_size,
        cfg.learning_rate,
        cfg.window_size
    );

    let mut history = Vec::with_capacity(cfg.epochs);
    for epoch in 1..=cfg.epochs {
        let pairs = sampler.sample(&ctx.sequence);
        if pairs.is_empty() {
            log::warn!("Epoch {}: subsampling kept no targets, skipping", epoch);
            continue;
        }
        history.push(trainer.run_epoch(epoch, &pairs)?);
    }
    if history.is_empty() {
        log::warn!("Every epoch was empty after subsampling; embeddings are untrained");
    }

    Ok((trainer.into_model(), history))
}
