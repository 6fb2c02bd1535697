//! Readers for the two text layouts.
//!
//! Plain text: one `word c1 c2 … cn` line per word, whitespace-delimited,
//! dimensionality inferred from the first non-empty line. Text with
//! header: identical, preceded by a `vocab_size dims` line.

use log::info;

use crate::embeddings::error::{LoadError, Result};
use crate::embeddings::models::{Format, LoadMode, Metadata};
use crate::embeddings::storage::{EmbeddingMatrix, OwnedMatrix};
use crate::embeddings::vocab::Vocabulary;
use crate::embeddings::Embeddings;

/// Read a plain text file; dims are inferred from the first row.
pub fn read(buf: &[u8]) -> Result<Embeddings> {
    let source = String::from_utf8_lossy(buf);
    let (words, data, dims) = parse_rows(source.lines(), None)?;
    info!("text file: {} words, {dims} dimensions", words.len());
    bind(words, data, dims, Format::Text)
}

/// Read a text file whose first line declares `vocab_size dims`.
pub fn read_with_dims(buf: &[u8]) -> Result<Embeddings> {
    let source = String::from_utf8_lossy(buf);
    let mut lines = source.lines();

    let header = lines
        .next()
        .ok_or_else(|| LoadError::MalformedHeader("missing shape header line".to_string()))?;
    let mut fields = header.split_whitespace();
    let vocab_size: usize = parse_shape_field(fields.next(), "vocab_size")?;
    let dims: usize = parse_shape_field(fields.next(), "dims")?;
    if fields.next().is_some() {
        return Err(LoadError::MalformedHeader(format!(
            "expected `vocab_size dims` header, got {header:?}"
        )));
    }
    if dims == 0 {
        return Err(LoadError::MalformedHeader(
            "dimensionality must be positive".to_string(),
        ));
    }
    info!("text header: {vocab_size} words, {dims} dimensions");

    let (words, data, dims) = parse_rows(lines, Some(dims))?;
    if words.len() < vocab_size {
        return Err(LoadError::TruncatedInput {
            context: "embedding rows",
            needed: vocab_size as u64,
            available: words.len() as u64,
        });
    }
    if words.len() > vocab_size {
        return Err(LoadError::MalformedHeader(format!(
            "header declares {vocab_size} rows, found {}",
            words.len()
        )));
    }
    bind(words, data, dims, Format::TextWithDims)
}

fn bind(words: Vec<String>, data: Vec<f32>, dims: usize, format: Format) -> Result<Embeddings> {
    let vocab = Vocabulary::new(words)?;
    let matrix = EmbeddingMatrix::Owned(OwnedMatrix::new(data, vocab.len(), dims));
    let metadata = Metadata {
        format,
        mode: LoadMode::OwnedCopy,
        normalized: false,
    };
    Ok(Embeddings::from_parts(vocab, matrix, metadata, None))
}

/// Parse `word c1 c2 … cn` rows. Empty lines are skipped. With
/// `declared_dims` unset, the first row fixes the dimensionality; every
/// later row must agree.
fn parse_rows<'a>(
    lines: impl Iterator<Item = &'a str>,
    declared_dims: Option<usize>,
) -> Result<(Vec<String>, Vec<f32>, usize)> {
    let mut words = Vec::new();
    let mut data = Vec::new();
    let mut dims = declared_dims;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        // A non-empty line always yields at least one field.
        let word = fields.next().unwrap_or_default();

        let row_start = data.len();
        for field in fields {
            let component: f32 = field.parse().map_err(|_| {
                LoadError::MalformedHeader(format!(
                    "invalid float component {field:?} for word {word:?}"
                ))
            })?;
            data.push(component);
        }
        let row_dims = data.len() - row_start;

        match dims {
            None => {
                if row_dims == 0 {
                    return Err(LoadError::MalformedHeader(format!(
                        "row for word {word:?} has no components"
                    )));
                }
                dims = Some(row_dims);
            }
            Some(expected) if row_dims != expected => {
                return Err(LoadError::DimensionMismatch {
                    context: "text row",
                    expected,
                    found: row_dims,
                });
            }
            Some(_) => {}
        }
        words.push(word.to_string());
    }

    let dims = dims.ok_or_else(|| {
        LoadError::MalformedHeader("file contains no embedding rows".to_string())
    })?;
    Ok((words, data, dims))
}

fn parse_shape_field(field: Option<&str>, name: &str) -> Result<usize> {
    field
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| LoadError::MalformedHeader(format!("invalid {name} in shape header")))
}
