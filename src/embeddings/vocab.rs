//! Word → row index mapping, with optional subword (character n-gram) hashing.

use std::collections::HashMap;

use super::error::{LoadError, Result};

/// Boundary markers wrapped around a word before n-gram enumeration.
const BOW: char = '<';
const EOW: char = '>';

/// Subword hashing parameters for open-vocabulary lookup.
///
/// N-grams are drawn from the word bracketed with `<` and `>`, for
/// character lengths in `[min_n, max_n]`, hashed with 32-bit FNV-1a and
/// reduced modulo `buckets`. Bucket rows sit directly after the word rows
/// in the embedding matrix.
#[derive(Debug, Clone)]
pub struct SubwordIndexer {
    min_n: u32,
    max_n: u32,
    buckets: u64,
}

impl SubwordIndexer {
    pub fn new(min_n: u32, max_n: u32, buckets: u64) -> Result<Self> {
        if min_n == 0 || min_n > max_n {
            return Err(LoadError::MalformedHeader(format!(
                "invalid n-gram range: min_n={min_n}, max_n={max_n}"
            )));
        }
        if buckets == 0 {
            return Err(LoadError::MalformedHeader(
                "subword bucket count must be positive".to_string(),
            ));
        }
        Ok(SubwordIndexer {
            min_n,
            max_n,
            buckets,
        })
    }

    pub fn min_n(&self) -> u32 {
        self.min_n
    }

    pub fn max_n(&self) -> u32 {
        self.max_n
    }

    pub fn buckets(&self) -> u64 {
        self.buckets
    }

    /// Bucket slots (0-based within the bucket block) for all n-grams of
    /// `word`. Repeated slots are kept: each n-gram contributes one
    /// equal-weight term to an averaged vector.
    ///
    /// Empty when no n-gram fits, i.e. the bracketed word is shorter than
    /// `min_n` characters.
    pub fn bucket_slots(&self, word: &str) -> Vec<u64> {
        let bracketed = format!("{BOW}{word}{EOW}");
        // Character boundaries, so n-grams never split a multi-byte char.
        let mut bounds: Vec<usize> = bracketed.char_indices().map(|(i, _)| i).collect();
        bounds.push(bracketed.len());
        let n_chars = bounds.len() - 1;

        let bytes = bracketed.as_bytes();
        let mut slots = Vec::new();
        for start in 0..n_chars {
            for len in self.min_n as usize..=self.max_n as usize {
                let end = start + len;
                if end > n_chars {
                    break;
                }
                let gram = &bytes[bounds[start]..bounds[end]];
                slots.push(u64::from(fnv1a(gram)) % self.buckets);
            }
        }
        slots
    }
}

/// fastText's 32-bit FNV-1a over the n-gram bytes.
///
/// Each byte is sign-extended before mixing, matching the reference
/// implementation's arithmetic on signed chars. Changing this breaks
/// compatibility with every trained fastText model.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for &b in bytes {
        h ^= b as i8 as i32 as u32;
        h = h.wrapping_mul(16_777_619);
    }
    h
}

/// The word → row index mapping for one loaded embedding matrix.
///
/// Matching is exact and case-sensitive; no normalization is applied.
#[derive(Debug)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
    subwords: Option<SubwordIndexer>,
}

impl Vocabulary {
    /// Build a vocabulary without subword metadata.
    ///
    /// Duplicate words are rejected: accepting them would leave matrix rows
    /// no word maps to and break the vocab-size/row-count invariant.
    pub fn new(words: Vec<String>) -> Result<Self> {
        Self::build(words, None)
    }

    /// Build a subword-capable vocabulary.
    pub fn with_subwords(words: Vec<String>, indexer: SubwordIndexer) -> Result<Self> {
        Self::build(words, Some(indexer))
    }

    fn build(words: Vec<String>, subwords: Option<SubwordIndexer>) -> Result<Self> {
        let mut index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.clone(), i).is_some() {
                return Err(LoadError::DuplicateWord { word: word.clone() });
            }
        }
        Ok(Vocabulary {
            words,
            index,
            subwords,
        })
    }

    /// Number of in-vocabulary words (excluding subword buckets).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The ordered word list; position equals matrix row.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn subword_indexer(&self) -> Option<&SubwordIndexer> {
        self.subwords.as_ref()
    }

    /// Matrix row indices of the n-gram buckets for `word`, offset past the
    /// word rows. Empty when the vocabulary carries no subword metadata or
    /// no n-gram fits the word.
    pub fn subword_rows(&self, word: &str) -> Vec<usize> {
        match &self.subwords {
            Some(indexer) => indexer
                .bucket_slots(word)
                .iter()
                .map(|&slot| self.words.len() + slot as usize)
                .collect(),
            None => Vec::new(),
        }
    }
}
