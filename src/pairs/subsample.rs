// subsample.rs: Keep probabilities for subsampling frequent targets.
//
// Frequency mode (observed counts, threshold s, relative frequency f):
//     keep = min(1, sqrt(s / f) + s / f)
// Rank mode (type list assumed sorted by descending frequency, Zipf estimate):
//     inv  = r (ln r + γ) + 1/2 - 1/(12 r)
//     keep = min(1, sqrt(s * inv))
// The OOV id always has keep = 0.

use crate::config::sampling::EULER_GAMMA;
use crate::config::vocab::OOV_ID;
use crate::config::SubsamplingMode;
use crate::pipeline::PipelineContext;

#[derive(Debug, Clone, PartialEq)]
pub struct SubsamplingTable {
    keep: Vec<f32>,
}

impl SubsamplingTable {
    /// Build the table for `mode`, or `None` when subsampling is disabled.
    pub fn for_context(mode: SubsamplingMode, ctx: &PipelineContext, threshold: f64) -> Option<Self> {
        let table = match mode {
            SubsamplingMode::Frequency => Self::from_counts(&ctx.id_counts(), threshold),
            SubsamplingMode::Rank => Self::from_rank(ctx.vocab.table_rows(), threshold),
            SubsamplingMode::None => return None,
        };
        log::debug!(
            "Subsampling ({:?}, threshold {}): mean keep probability {:.4}",
            mode,
            threshold,
            table.mean_keep()
        );
        Some(table)
    }

    /// `counts` is indexed by id; slot 0 (OOV) is ignored for the total.
    pub fn from_counts(counts: &[u64], threshold: f64) -> Self {
        let total: u64 = counts.iter().skip(1).sum();
        let keep = counts
            .iter()
            .enumerate()
            .map(|(id, &count)| {
                if id as u32 == OOV_ID {
                    0.0
                } else if count == 0 || total == 0 {
                    1.0
                } else {
                    let ratio = threshold / (count as f64 / total as f64);
                    (ratio.sqrt() + ratio).min(1.0) as f32
                }
            })
            .collect();
        Self { keep }
    }

    /// `rows` is V + 1; id r is treated as frequency rank r.
    pub fn from_rank(rows: usize, threshold: f64) -> Self {
        let keep = (0..rows)
            .map(|id| {
                if id as u32 == OOV_ID {
                    return 0.0;
                }
                let r = id as f64;
                let inv = r * (r.ln() + EULER_GAMMA) + 0.5 - 1.0 / (12.0 * r);
                (threshold * inv).sqrt().min(1.0) as f32
            })
            .collect();
        Self { keep }
    }

    pub fn keep_probability(&self, id: u32) -> f32 {
        self.keep.get(id as usize).copied().unwrap_or(1.0)
    }

    fn mean_keep(&self) -> f64 {
        let real = &self.keep[1.min(self.keep.len())..];
        if real.is_empty() {
            return 0.0;
        }
        real.iter().map(|&k| k as f64).sum::<f64>() / real.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_keep_decreases_with_count() {
        // id 1 very frequent, id 3 rare, id 4 unseen.
        let counts = [5, 900_000, 90_000, 10, 0];
        let table = SubsamplingTable::from_counts(&counts, 1e-5);

        assert_eq!(table.keep_probability(0), 0.0);
        let k1 = table.keep_probability(1);
        let k2 = table.keep_probability(2);
        let k3 = table.keep_probability(3);
        assert!(k1 < k2 && k2 < k3, "{k1} {k2} {k3}");
        assert_eq!(k3, 1.0);
        assert_eq!(table.keep_probability(4), 1.0);
        for id in 0..counts.len() as u32 {
            let k = table.keep_probability(id);
            assert!((0.0..=1.0).contains(&k));
        }
    }

    #[test]
    fn test_frequency_formula_value() {
        // f = 0.5, s = 0.01 → ratio 0.02 → sqrt(0.02) + 0.02
        let table = SubsamplingTable::from_counts(&[0, 1, 1], 0.01);
        let expected = (0.02f64.sqrt() + 0.02) as f32;
        assert!((table.keep_probability(1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rank_keep_is_monotonic() {
        let table = SubsamplingTable::from_rank(50, 1e-5);
        assert_eq!(table.keep_probability(0), 0.0);
        for id in 1..49 {
            assert!(table.keep_probability(id) <= table.keep_probability(id + 1));
        }
        // Large ranks eventually reach 1.
        let wide = SubsamplingTable::from_rank(200_000, 1e-5);
        assert_eq!(wide.keep_probability(199_999), 1.0);
    }

    #[test]
    fn test_unknown_id_is_kept() {
        let table = SubsamplingTable::from_rank(3, 1e-5);
        assert_eq!(table.keep_probability(99), 1.0);
    }
}
