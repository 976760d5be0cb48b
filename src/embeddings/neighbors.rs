use anyhow::{bail, Context};
use candle_core::Tensor;

use crate::config::vocab::OOV_ID;
use crate::vocab::Vocabulary;

/// Top-`k` words by cosine similarity to `word`, best first. Skips the OOV row
/// and the query itself.
pub fn nearest(table: &Tensor, vocab: &Vocabulary, word: &str, k: usize) -> anyhow::Result<Vec<(String, f32)>> {
    let rows: Vec<Vec<f32>> = table.to_vec2().context("read embedding table")?;
    if rows.len() != vocab.table_rows() {
        bail!(
            "embedding table has {} rows but the word index needs {} (V+1)",
            rows.len(),
            vocab.table_rows()
        );
    }

    let query_id = vocab.id(word);
    if query_id == OOV_ID {
        bail!("'{word}' is not in the vocabulary");
    }
    let query = &rows[query_id as usize];

    let mut scored: Vec<(u32, f32)> = vocab
        .iter()
        .filter(|&(id, _)| id != query_id)
        .map(|(id, _)| (id, cosine(query, &rows[id as usize])))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .filter_map(|(id, sim)| vocab.word(id).map(|w| (w.to_string(), sim)))
        .collect())
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn fixture() -> (Tensor, Vocabulary) {
        let vocab = Vocabulary::from_types(["cyning", "hlaford", "stan", "eorl"]);
        let table = Tensor::new(
            &[
                [9f32, 9.0],  // OOV row, would win if not skipped
                [1.0, 0.1],   // cyning
                [0.9, 0.2],   // hlaford
                [-1.0, 0.0],  // stan
                [0.8, 0.3],   // eorl
            ],
            &Device::Cpu,
        )
        .unwrap();
        (table, vocab)
    }

    #[test]
    fn test_nearest_orders_by_similarity() {
        let (table, vocab) = fixture();
        let hits = nearest(&table, &vocab, "cyning", 2).unwrap();
        let words: Vec<&str> = hits.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["hlaford", "eorl"]);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn test_nearest_excludes_query_and_oov() {
        let (table, vocab) = fixture();
        let hits = nearest(&table, &vocab, "stan", 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|(w, _)| w != "stan"));
        assert_eq!(hits.last().unwrap().0, "cyning");
    }

    #[test]
    fn test_unknown_word_and_shape_mismatch() {
        let (table, vocab) = fixture();
        assert!(nearest(&table, &vocab, "draca", 3).is_err());

        let small = Vocabulary::from_types(["cyning"]);
        assert!(nearest(&table, &small, "cyning", 3).is_err());
    }
}
