//! # embed-reader
//!
//! A read-only storage and retrieval engine for word embeddings.
//! Loads trained word vectors from the native `EMBR` container (optionally
//! memory-mapped), word2vec binary, plain text, text-with-header, or
//! fastText binary files, and answers `embedding(word)` lookups in
//! near-constant time.
//!
//! Out-of-vocabulary words are resolved through character n-gram hashing
//! for formats that carry subword metadata (fastText models and native
//! files with a subword vocabulary chunk).
pub mod embeddings;

// Re-export the main types for convenience
pub use embeddings::{
    error::{LoadError, Result},
    models::{Format, LoadMode, Metadata},
    Embeddings,
};
