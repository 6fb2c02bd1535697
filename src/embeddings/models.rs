//! Data structures describing a loaded embedding file.

/// On-disk layouts understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// The self-describing `EMBR` chunked container.
    Native,
    /// word2vec binary (`<vocab_size> <dims>` header, binary rows).
    Word2Vec,
    /// One `word c1 c2 … cn` line per word, dims inferred.
    Text,
    /// As [`Format::Text`], with a leading `vocab_size dims` line.
    TextWithDims,
    /// fastText binary model.
    FastText,
}

/// How the embedding matrix is held for the lifetime of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Matrix copied into an owned heap allocation.
    OwnedCopy,
    /// Matrix viewed in place through a shared file mapping.
    /// Only available for [`Format::Native`].
    MemoryMapped,
}

/// Immutable facts about a loaded embedding file.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub format: Format,
    pub mode: LoadMode,
    /// True when the stored vectors are unit-length normalized and the
    /// original norms are carried in a separate block.
    pub normalized: bool,
}
