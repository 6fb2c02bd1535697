//! Reader for the word2vec binary format.
//!
//! Layout:
//! - ASCII header line `<vocab_size> <dims>\n`
//! - vocab_size records of:
//!   - word token, terminated by a single space (0x20)
//!   - dims little-endian f32
//!   - optional newline before the next record
//!
//! Word tokens must not contain embedded delimiter bytes; a newline inside
//! a token means a record boundary was lost.

use log::info;

use crate::embeddings::decoder::Decoder;
use crate::embeddings::error::{LoadError, Result};
use crate::embeddings::models::{Format, LoadMode, Metadata};
use crate::embeddings::storage::{EmbeddingMatrix, OwnedMatrix};
use crate::embeddings::vocab::Vocabulary;
use crate::embeddings::Embeddings;

pub fn read(buf: &[u8]) -> Result<Embeddings> {
    let mut decoder = Decoder::new(buf);

    let (vocab_size, dims) = parse_header(&mut decoder)?;
    info!("word2vec header: {vocab_size} words, {dims} dimensions");

    let mut words = Vec::with_capacity(vocab_size);
    let mut data = Vec::new();
    for _ in 0..vocab_size {
        // Records may be separated by a newline after the floats.
        decoder.skip_any(b"\r\n ");
        let token = decoder.read_delimited(b' ', "word token")?;
        if token.contains(&b'\n') {
            return Err(LoadError::MalformedHeader(
                "word token contains a record delimiter".to_string(),
            ));
        }
        words.push(String::from_utf8_lossy(token).into_owned());
        decoder.read_f32_into(dims, &mut data, "embedding row")?;
    }

    decoder.skip_any(b"\r\n ");
    if !decoder.is_empty() {
        return Err(LoadError::MalformedHeader(
            "trailing data after the final record".to_string(),
        ));
    }

    let vocab = Vocabulary::new(words)?;
    let matrix = EmbeddingMatrix::Owned(OwnedMatrix::new(data, vocab_size, dims));
    let metadata = Metadata {
        format: Format::Word2Vec,
        mode: LoadMode::OwnedCopy,
        normalized: false,
    };
    Ok(Embeddings::from_parts(vocab, matrix, metadata, None))
}

/// Parse the `<vocab_size> <dims>` header line.
fn parse_header(decoder: &mut Decoder) -> Result<(usize, usize)> {
    let line = decoder.read_delimited(b'\n', "header line")?;
    let line = std::str::from_utf8(line)
        .map_err(|_| LoadError::MalformedHeader("header line is not ASCII".to_string()))?;

    let mut fields = line.split_whitespace();
    let vocab_size = parse_header_field(fields.next(), "vocab_size")?;
    let dims = parse_header_field(fields.next(), "dims")?;
    if fields.next().is_some() {
        return Err(LoadError::MalformedHeader(format!(
            "expected `vocab_size dims` header, got {line:?}"
        )));
    }
    if dims == 0 {
        return Err(LoadError::MalformedHeader(
            "dimensionality must be positive".to_string(),
        ));
    }
    Ok((vocab_size, dims))
}

fn parse_header_field(field: Option<&str>, name: &str) -> Result<usize> {
    field
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| LoadError::MalformedHeader(format!("invalid {name} in header")))
}
