//! One reader per supported on-disk layout.
//!
//! Each reader is a pure function from a byte source to a fully validated
//! [`Embeddings`](super::Embeddings) aggregate. Structural consistency
//! (dimension coherence, no truncation, no duplicate vocabulary entries)
//! is checked before an aggregate is returned; loading is all-or-nothing.

pub mod fasttext;
pub mod native;
pub mod text;
pub mod word2vec;
