use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context};

use crate::config::vocab::OOV_ID;
use crate::corpus;

/// Word index built from a fixed type list.
///
/// Position `i` of the type list gets id `i + 1`; id 0 is the OOV sentinel and
/// never maps back to a word.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    word_to_id: HashMap<String, u32>,
    // id_to_word[i] is the word for id i + 1.
    id_to_word: Vec<String>,
}

impl Vocabulary {
    pub fn from_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::default();
        for word in types {
            let word = word.into();
            if vocab.word_to_id.contains_key(&word) {
                log::warn!("Duplicate type '{}' ignored (keeps id {})", word, vocab.id(&word));
                continue;
            }
            let id = vocab.id_to_word.len() as u32 + 1;
            vocab.word_to_id.insert(word.clone(), id);
            vocab.id_to_word.push(word);
        }
        vocab
    }

    /// Forward lookup. Unknown words map to the OOV id.
    pub fn id(&self, word: &str) -> u32 {
        self.word_to_id.get(word).copied().unwrap_or(OOV_ID)
    }

    /// Reverse lookup. `None` for the OOV id and ids past the end.
    pub fn word(&self, id: u32) -> Option<&str> {
        if id == OOV_ID {
            return None;
        }
        self.id_to_word.get(id as usize - 1).map(String::as_str)
    }

    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        tokens.iter().map(|t| self.id(t.as_ref())).collect()
    }

    /// Number of real words (V). Excludes the OOV row.
    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }

    /// Rows needed in an embedding table: V + 1 (row 0 is OOV).
    pub fn table_rows(&self) -> usize {
        self.len() + 1
    }

    /// `(id, word)` for every real word, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.id_to_word
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u32 + 1, w.as_str()))
    }

    /// Write the word-index table: one `id<TAB>word` line per real word.
    pub fn write_index(&self, path: &Path) -> anyhow::Result<()> {
        let mut body = String::new();
        for (id, word) in self.iter() {
            writeln!(body, "{id}\t{word}")?;
        }
        corpus::write_atomic(path, body.as_bytes())?;
        log::info!("Wrote word index ({} entries) to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a table produced by [`Vocabulary::write_index`]. Ids must run 1, 2, 3, ...
    pub fn read_index(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word index {}", path.display()))?;

        let mut types = Vec::new();
        let mut seen = HashSet::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((id, word)) = line.split_once('\t') else {
                bail!("{}:{}: expected id<TAB>word", path.display(), lineno + 1);
            };
            let id: u32 = id
                .trim()
                .parse()
                .with_context(|| format!("{}:{}: bad id '{}'", path.display(), lineno + 1, id))?;
            let expected = types.len() as u32 + 1;
            if id != expected {
                bail!(
                    "{}:{}: ids must be contiguous from 1 (expected {}, got {})",
                    path.display(),
                    lineno + 1,
                    expected,
                    id
                );
            }
            if !seen.insert(word) {
                bail!("{}:{}: duplicate word '{}'", path.display(), lineno + 1, word);
            }
            types.push(word.to_string());
        }

        let vocab = Self::from_types(types);
        log::info!("Loaded word index ({} entries) from {}", vocab.len(), path.display());
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_word_vocabulary() {
        let vocab = Vocabulary::from_types(["a", "b"]);
        assert_eq!(vocab.id("a"), 1);
        assert_eq!(vocab.id("b"), 2);
        assert_eq!(vocab.encode(&["a", "c"]), vec![1, 0]);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.table_rows(), 3);
    }

    #[test]
    fn test_unknown_words_are_oov() {
        let vocab = Vocabulary::from_types(["cyning", "hlaford"]);
        for w in ["", "Cyning", "cyning ", "þegn", "1"] {
            assert_eq!(vocab.id(w), OOV_ID, "{w:?}");
        }
    }

    #[test]
    fn test_reverse_is_inverse_of_forward() {
        let types = ["se", "þe", "and", "on", "wæs"];
        let vocab = Vocabulary::from_types(types);
        for w in types {
            assert_eq!(vocab.word(vocab.id(w)), Some(w));
        }
        for id in 1..=types.len() as u32 {
            assert_eq!(vocab.id(vocab.word(id).unwrap()), id);
        }
        assert_eq!(vocab.word(OOV_ID), None);
        assert_eq!(vocab.word(types.len() as u32 + 1), None);
    }

    #[test]
    fn test_duplicates_keep_first_id() {
        let vocab = Vocabulary::from_types(["a", "b", "a", "c"]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id("a"), 1);
        assert_eq!(vocab.id("c"), 3);
        assert_eq!(vocab.word(3), Some("c"));
    }

    #[test]
    fn test_index_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word_index.tsv");
        let vocab = Vocabulary::from_types(["eorðe", "heofon", "sæ"]);
        vocab.write_index(&path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1\teorðe\n2\theofon\n3\tsæ\n"
        );
        assert_eq!(Vocabulary::read_index(&path).unwrap(), vocab);
    }

    #[test]
    fn test_read_index_rejects_gaps_and_garbage() {
        let dir = tempfile::tempdir().unwrap();

        let gap = dir.path().join("gap.tsv");
        std::fs::write(&gap, "1\ta\n3\tb\n").unwrap();
        let err = Vocabulary::read_index(&gap).unwrap_err();
        assert!(format!("{err:#}").contains("contiguous"));

        let no_tab = dir.path().join("notab.tsv");
        std::fs::write(&no_tab, "1 a\n").unwrap();
        assert!(Vocabulary::read_index(&no_tab).is_err());

        let bad_id = dir.path().join("badid.tsv");
        std::fs::write(&bad_id, "one\ta\n").unwrap();
        assert!(Vocabulary::read_index(&bad_id).is_err());
    }

    #[test]
    fn test_read_index_rejects_duplicate_word() {
        let dir = tempfile::tempdir().unwrap();
        let dup = dir.path().join("dup.tsv");
        std::fs::write(&dup, "1\tse\n2\tcyning\n3\tse\n4\tþegn\n").unwrap();
        let err = format!("{:#}", Vocabulary::read_index(&dup).unwrap_err());
        assert!(err.contains(":3: duplicate word 'se'"), "{err}");
    }
}
