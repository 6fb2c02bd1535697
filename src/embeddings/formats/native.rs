//! Reader for the native `EMBR` chunked container.
//!
//! File layout:
//! - 4 bytes: magic `EMBR`
//! - 4 bytes: format version (little-endian u32, currently 1)
//! - Chunk sequence until end of file. Each chunk:
//!   - 4 bytes: chunk identifier (little-endian u32)
//!   - 8 bytes: payload length in bytes (little-endian u64)
//!   - payload
//!
//! Chunk identifiers:
//! - 1: vocabulary: u64 word count, then per word a u32 byte length and
//!   the UTF-8 bytes
//! - 2: subword vocabulary: u32 min_n, u32 max_n, u64 bucket count, then
//!   a word list as in chunk 1; bucket rows follow word rows in the matrix
//! - 3: matrix: u64 rows, u32 dims, zero padding up to the next
//!   4-byte-aligned file offset, then rows x dims little-endian f32
//! - 4: norms: u64 count, count little-endian f32 (norms of the original
//!   vectors, one per word)
//!
//! Unknown chunk identifiers are skipped using their declared length; an
//! unknown version is fatal. The matrix floats are 4-byte aligned relative
//! to the start of the file, so a page-aligned memory mapping can view
//! them in place without copying.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use memmap2::Mmap;

use crate::embeddings::decoder::Decoder;
use crate::embeddings::error::{LoadError, Result};
use crate::embeddings::models::{Format, LoadMode, Metadata};
use crate::embeddings::storage::{EmbeddingMatrix, MappedMatrix, OwnedMatrix};
use crate::embeddings::vocab::{SubwordIndexer, Vocabulary};
use crate::embeddings::Embeddings;

const MAGIC: [u8; 4] = *b"EMBR";
const FORMAT_VERSION: u32 = 1;

const CHUNK_VOCAB: u32 = 1;
const CHUNK_SUBWORD_VOCAB: u32 = 2;
const CHUNK_MATRIX: u32 = 3;
const CHUNK_NORMS: u32 = 4;

/// Everything the chunk table describes, with the matrix located but its
/// floats not yet materialized.
struct Toc {
    vocab: Vocabulary,
    matrix_offset: usize,
    rows: usize,
    dims: usize,
    norms: Option<Vec<f32>>,
}

/// Read a native container into owned storage.
pub fn read(buf: &[u8]) -> Result<Embeddings> {
    let toc = parse(buf)?;
    let mut data = Vec::new();
    let mut decoder = Decoder::new(&buf[toc.matrix_offset..]);
    decoder.read_f32_into(toc.rows * toc.dims, &mut data, "matrix data")?;
    let matrix = EmbeddingMatrix::Owned(OwnedMatrix::new(data, toc.rows, toc.dims));
    bind(toc, matrix, LoadMode::OwnedCopy)
}

/// Memory-map a native container, viewing the matrix floats in place.
pub fn map(path: &Path) -> Result<Embeddings> {
    let file = File::open(path)?;
    // Safety: the mapping is read-only; mutating the backing file while
    // the aggregate is alive is outside the engine's contract.
    let map = unsafe { Mmap::map(&file)? };
    let toc = parse(&map)?;
    let matrix = EmbeddingMatrix::Mapped(MappedMatrix::new(
        Arc::new(map),
        toc.matrix_offset,
        toc.rows,
        toc.dims,
    )?);
    bind(toc, matrix, LoadMode::MemoryMapped)
}

fn bind(toc: Toc, matrix: EmbeddingMatrix, mode: LoadMode) -> Result<Embeddings> {
    let metadata = Metadata {
        format: Format::Native,
        mode,
        normalized: toc.norms.is_some(),
    };
    Ok(Embeddings::from_parts(toc.vocab, matrix, metadata, toc.norms))
}

/// Walk the chunk table, validating structure without copying floats.
fn parse(buf: &[u8]) -> Result<Toc> {
    let mut decoder = Decoder::new(buf);

    let magic = decoder.take(4, "container magic")?;
    if magic != MAGIC {
        return Err(LoadError::UnsupportedFormat(
            "not a native embedding container (bad magic)".to_string(),
        ));
    }
    let version = decoder.read_u32_le("container version")?;
    if version != FORMAT_VERSION {
        return Err(LoadError::MalformedHeader(format!(
            "unknown container version: {version}"
        )));
    }

    let mut vocab: Option<Vocabulary> = None;
    let mut matrix: Option<(usize, usize, usize)> = None;
    let mut norms: Option<Vec<f32>> = None;

    while !decoder.is_empty() {
        let id = decoder.read_u32_le("chunk identifier")?;
        let len = to_usize(decoder.read_u64_le("chunk length")?, "chunk length")?;
        let start = decoder.position();

        match id {
            CHUNK_VOCAB | CHUNK_SUBWORD_VOCAB => {
                if vocab.is_some() {
                    return Err(LoadError::MalformedHeader(
                        "more than one vocabulary chunk".to_string(),
                    ));
                }
                vocab = Some(parse_vocab(&mut decoder, id)?);
            }
            CHUNK_MATRIX => {
                if matrix.is_some() {
                    return Err(LoadError::MalformedHeader(
                        "more than one matrix chunk".to_string(),
                    ));
                }
                matrix = Some(parse_matrix(&mut decoder)?);
            }
            CHUNK_NORMS => {
                if norms.is_some() {
                    return Err(LoadError::MalformedHeader(
                        "more than one norms chunk".to_string(),
                    ));
                }
                norms = Some(parse_norms(&mut decoder)?);
            }
            _ => {
                debug!("Skipping unknown chunk {id} ({len} bytes)");
                decoder.skip(len, "unknown chunk payload")?;
            }
        }

        if decoder.position() - start != len {
            return Err(LoadError::MalformedHeader(format!(
                "chunk {id} length disagrees with its payload"
            )));
        }
    }

    let vocab = vocab
        .ok_or_else(|| LoadError::MalformedHeader("missing vocabulary chunk".to_string()))?;
    let (matrix_offset, rows, dims) =
        matrix.ok_or_else(|| LoadError::MalformedHeader("missing matrix chunk".to_string()))?;

    let expected_rows = vocab.len()
        + vocab
            .subword_indexer()
            .map_or(0, |indexer| indexer.buckets() as usize);
    if rows != expected_rows {
        return Err(LoadError::MalformedHeader(format!(
            "matrix has {rows} rows, vocabulary requires {expected_rows}"
        )));
    }
    if let Some(norms) = &norms {
        if norms.len() != vocab.len() {
            return Err(LoadError::MalformedHeader(format!(
                "norms chunk has {} entries for {} words",
                norms.len(),
                vocab.len()
            )));
        }
    }

    Ok(Toc {
        vocab,
        matrix_offset,
        rows,
        dims,
        norms,
    })
}

fn parse_vocab(decoder: &mut Decoder, id: u32) -> Result<Vocabulary> {
    let indexer = if id == CHUNK_SUBWORD_VOCAB {
        let min_n = decoder.read_u32_le("subword min_n")?;
        let max_n = decoder.read_u32_le("subword max_n")?;
        let buckets = decoder.read_u64_le("subword bucket count")?;
        Some(SubwordIndexer::new(min_n, max_n, buckets)?)
    } else {
        None
    };

    let count = to_usize(decoder.read_u64_le("vocabulary size")?, "vocabulary size")?;
    let mut words = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        words.push(decoder.read_prefixed_str("vocabulary entry")?.to_string());
    }

    match indexer {
        Some(indexer) => Vocabulary::with_subwords(words, indexer),
        None => Vocabulary::new(words),
    }
}

/// Locate the float payload without reading it. Returns
/// `(offset, rows, dims)` where `offset` is absolute within the file.
fn parse_matrix(decoder: &mut Decoder) -> Result<(usize, usize, usize)> {
    let rows = to_usize(decoder.read_u64_le("matrix row count")?, "matrix row count")?;
    let dims = decoder.read_u32_le("matrix dimensionality")? as usize;
    if dims == 0 {
        return Err(LoadError::MalformedHeader(
            "matrix dimensionality must be positive".to_string(),
        ));
    }

    // Padding keeps the floats 4-byte aligned relative to the file start.
    let padding = (4 - decoder.position() % 4) % 4;
    decoder.skip(padding, "matrix padding")?;

    let offset = decoder.position();
    let byte_len = rows
        .checked_mul(dims)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| LoadError::MalformedHeader("matrix size overflow".to_string()))?;
    decoder.skip(byte_len, "matrix data")?;
    Ok((offset, rows, dims))
}

fn parse_norms(decoder: &mut Decoder) -> Result<Vec<f32>> {
    let count = to_usize(decoder.read_u64_le("norms count")?, "norms count")?;
    let mut norms = Vec::new();
    decoder.read_f32_into(count, &mut norms, "norms data")?;
    Ok(norms)
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| LoadError::MalformedHeader(format!("{what} overflow: {value}")))
}
