//! Core embedding storage engine.

pub mod error;
pub mod models;

mod decoder;
mod formats;
mod storage;
mod vocab;

use std::fs;
use std::path::Path;

use log::info;

pub use error::{LoadError, Result};
pub use models::{Format, LoadMode, Metadata};
pub use storage::EmbeddingMatrix;
pub use vocab::{SubwordIndexer, Vocabulary};

/// A loaded, immutable set of word embeddings.
///
/// Bound once by a format reader from a vocabulary, an embedding matrix,
/// and metadata; never mutated afterwards. Concurrent lookups against a
/// shared reference require no locking: there is no interior mutability
/// or lazily computed state anywhere in the lookup path.
#[derive(Debug)]
pub struct Embeddings {
    vocab: Vocabulary,
    matrix: EmbeddingMatrix,
    metadata: Metadata,
    /// Per-word norms of the original vectors, when the source carried them.
    norms: Option<Vec<f32>>,
}

impl Embeddings {
    /// Load embeddings from a native `EMBR` container file.
    ///
    /// The format is detected from the file's magic bytes; any other layout
    /// fails with [`LoadError::UnsupportedFormat`] (the remaining formats
    /// have dedicated entry points). `LoadMode::MemoryMapped` views the
    /// matrix in place without copying floats.
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened or mapped
    /// - The magic bytes are not the native container's
    /// - The container version is unknown or a chunk is malformed
    /// - The file is shorter than its chunk table declares
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening embedding file: {} ({:?})", path.display(), mode);
        let embeddings = match mode {
            LoadMode::OwnedCopy => {
                let buf = fs::read(path)?;
                formats::native::read(&buf)?
            }
            LoadMode::MemoryMapped => formats::native::map(path)?,
        };
        info!(
            "Loaded {} words, {} dimensions",
            embeddings.len(),
            embeddings.dimensions()
        );
        Ok(embeddings)
    }

    /// Load embeddings from a fastText binary model.
    pub fn load_fasttext(path: impl AsRef<Path>) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        formats::fasttext::read(&buf)
    }

    /// Load embeddings from a text file.
    ///
    /// One word embedding per line, `word c1 c2 … cn`, whitespace-delimited.
    /// Dimensionality is inferred from the first non-empty line.
    pub fn load_text(path: impl AsRef<Path>) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        formats::text::read(&buf)
    }

    /// Load embeddings from a text file whose first line declares the
    /// matrix shape as `vocab_size dims`.
    pub fn load_text_with_dims(path: impl AsRef<Path>) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        formats::text::read_with_dims(&buf)
    }

    /// Load embeddings from a word2vec binary file.
    pub fn load_word2vec(path: impl AsRef<Path>) -> Result<Self> {
        let buf = fs::read(path.as_ref())?;
        formats::word2vec::read(&buf)
    }

    /// Bind validated parts into an aggregate. Readers have already
    /// established the row-count invariants; this only re-asserts them.
    pub(crate) fn from_parts(
        vocab: Vocabulary,
        matrix: EmbeddingMatrix,
        metadata: Metadata,
        norms: Option<Vec<f32>>,
    ) -> Self {
        let expected_rows = vocab.len()
            + vocab
                .subword_indexer()
                .map_or(0, |indexer| indexer.buckets() as usize);
        assert_eq!(matrix.rows(), expected_rows, "matrix row count mismatch");
        if let Some(norms) = &norms {
            assert_eq!(norms.len(), vocab.len(), "norms count mismatch");
        }
        Embeddings {
            vocab,
            matrix,
            metadata,
            norms,
        }
    }

    /// Embedding dimensionality, fixed for the lifetime of the aggregate.
    pub fn dimensions(&self) -> usize {
        self.matrix.dims()
    }

    /// Number of in-vocabulary words.
    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Embedding lookup.
    ///
    /// Known words always get their trained vector; only genuinely unseen
    /// words incur the subword fallback:
    /// 1. Exact vocabulary hit → copy of that matrix row.
    /// 2. Subword-capable vocabulary with at least one fitting n-gram →
    ///    equal-weight arithmetic mean of the hashed bucket rows.
    /// 3. Otherwise `None`.
    ///
    /// A returned vector's length always equals [`Self::dimensions`].
    pub fn embedding(&self, word: &str) -> Option<Vec<f32>> {
        if let Some(index) = self.vocab.index_of(word) {
            return Some(self.matrix.row(index).to_vec());
        }

        let rows = self.vocab.subword_rows(word);
        if rows.is_empty() {
            return None;
        }
        let mut mean = vec![0.0f32; self.matrix.dims()];
        for &row in &rows {
            for (acc, &component) in mean.iter_mut().zip(self.matrix.row(row)) {
                *acc += component;
            }
        }
        for acc in &mut mean {
            *acc /= rows.len() as f32;
        }
        Some(mean)
    }

    /// Norm of the original (pre-normalization) vector for an
    /// in-vocabulary word, when the source carried a norms block.
    pub fn norm(&self, word: &str) -> Option<f32> {
        let norms = self.norms.as_ref()?;
        self.vocab.index_of(word).map(|index| norms[index])
    }
}
