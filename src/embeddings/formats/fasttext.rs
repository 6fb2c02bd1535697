//! Reader for fastText binary models.
//!
//! Layout:
//! - 4 bytes: magic (i32 LE, 793712314)
//! - 4 bytes: format version (i32 LE, at most 12)
//! - Args block: dim, ws, epoch, min_count, neg, word_ngrams, loss, model,
//!   bucket, min_n, max_n, lr_update_rate (i32 LE each), t (f64 LE)
//! - Dictionary: size, nwords, nlabels (i32 LE), ntokens, pruneidx_size
//!   (i64 LE), then `size` entries of (NUL-terminated word bytes,
//!   i64 count, i8 entry type: 0 = word, 1 = label)
//! - 1 byte: quantization flag
//! - Input matrix: rows, cols (i64 LE), rows x cols little-endian f32
//!
//! The matrix covers the word rows followed by the n-gram bucket rows.
//! The output matrix and anything after the input matrix are not read.

use log::info;

use crate::embeddings::decoder::Decoder;
use crate::embeddings::error::{LoadError, Result};
use crate::embeddings::models::{Format, LoadMode, Metadata};
use crate::embeddings::storage::{EmbeddingMatrix, OwnedMatrix};
use crate::embeddings::vocab::{SubwordIndexer, Vocabulary};
use crate::embeddings::Embeddings;

const MAGIC: i32 = 793_712_314;
const MAX_VERSION: i32 = 12;

/// The sentence-end token never has subwords.
const EOS: &str = "</s>";

const ENTRY_WORD: i8 = 0;

struct Args {
    dim: usize,
    bucket: usize,
    min_n: i32,
    max_n: i32,
}

pub fn read(buf: &[u8]) -> Result<Embeddings> {
    let mut decoder = Decoder::new(buf);

    let magic = decoder.read_i32_le("model magic")?;
    if magic != MAGIC {
        return Err(LoadError::MalformedHeader(format!(
            "not a fastText model (magic {magic:#x})"
        )));
    }
    let version = decoder.read_i32_le("model version")?;
    if version > MAX_VERSION || version <= 0 {
        return Err(LoadError::MalformedHeader(format!(
            "unsupported fastText version: {version}"
        )));
    }

    let args = parse_args(&mut decoder)?;
    let words = parse_dictionary(&mut decoder)?;
    let nwords = words.len();

    if decoder.read_u8("quantization flag")? != 0 {
        return Err(LoadError::UnsupportedFormat(
            "quantized fastText models are not supported".to_string(),
        ));
    }

    let rows = non_negative(decoder.read_i64_le("matrix row count")?, "matrix rows")?;
    let cols = non_negative(decoder.read_i64_le("matrix column count")?, "matrix cols")?;
    if cols != args.dim {
        return Err(LoadError::DimensionMismatch {
            context: "fastText input matrix",
            expected: args.dim,
            found: cols,
        });
    }
    if rows != nwords + args.bucket {
        return Err(LoadError::MalformedHeader(format!(
            "input matrix has {rows} rows for {nwords} words and {} buckets",
            args.bucket
        )));
    }

    let float_count = rows
        .checked_mul(cols)
        .ok_or_else(|| LoadError::MalformedHeader("matrix size overflow".to_string()))?;
    let mut data = Vec::new();
    decoder.read_f32_into(float_count, &mut data, "matrix data")?;

    info!(
        "fastText model: {nwords} words, {} dims, n-grams {}..{}, {} buckets",
        args.dim, args.min_n, args.max_n, args.bucket
    );

    let subword_capable = args.min_n > 0 && args.max_n > 0 && args.bucket > 0;
    let (vocab, matrix) = if subword_capable {
        let indexer = SubwordIndexer::new(args.min_n as u32, args.max_n as u32, args.bucket as u64)?;
        precompute_word_rows(&mut data, &words, &indexer, args.dim);
        let vocab = Vocabulary::with_subwords(words, indexer)?;
        let matrix = OwnedMatrix::new(data, rows, args.dim);
        (vocab, matrix)
    } else {
        // No character n-grams: the bucket rows carry only word-ngram
        // features useless for lookup, so keep the word rows alone.
        data.truncate(nwords * args.dim);
        let vocab = Vocabulary::new(words)?;
        let matrix = OwnedMatrix::new(data, nwords, args.dim);
        (vocab, matrix)
    };

    let metadata = Metadata {
        format: Format::FastText,
        mode: LoadMode::OwnedCopy,
        normalized: false,
    };
    Ok(Embeddings::from_parts(
        vocab,
        EmbeddingMatrix::Owned(matrix),
        metadata,
        None,
    ))
}

fn parse_args(decoder: &mut Decoder) -> Result<Args> {
    let dim = non_negative(decoder.read_i32_le("dim")?.into(), "dim")?;
    if dim == 0 {
        return Err(LoadError::MalformedHeader(
            "dimensionality must be positive".to_string(),
        ));
    }
    for field in ["ws", "epoch", "min_count", "neg", "word_ngrams", "loss"] {
        decoder.read_i32_le(field)?;
    }
    let model = decoder.read_i32_le("model type")?;
    // 1 = cbow, 2 = skipgram, 3 = supervised
    if !(1..=3).contains(&model) {
        return Err(LoadError::MalformedHeader(format!(
            "unknown fastText model type: {model}"
        )));
    }
    let bucket = non_negative(decoder.read_i32_le("bucket count")?.into(), "bucket count")?;
    let min_n = decoder.read_i32_le("min_n")?;
    let max_n = decoder.read_i32_le("max_n")?;
    if min_n < 0 || max_n < 0 {
        return Err(LoadError::MalformedHeader(format!(
            "invalid n-gram range: {min_n}..{max_n}"
        )));
    }
    decoder.read_i32_le("lr_update_rate")?;
    decoder.read_f64_le("sampling threshold")?;
    Ok(Args {
        dim,
        bucket,
        min_n,
        max_n,
    })
}

/// Parse the dictionary section, returning the word entries in order.
/// Label entries contribute no matrix rows and are dropped.
fn parse_dictionary(decoder: &mut Decoder) -> Result<Vec<String>> {
    let size = non_negative(decoder.read_i32_le("dictionary size")?.into(), "dictionary size")?;
    let nwords = non_negative(decoder.read_i32_le("word count")?.into(), "word count")?;
    let nlabels = non_negative(decoder.read_i32_le("label count")?.into(), "label count")?;
    decoder.read_i64_le("token count")?;
    let pruneidx_size = decoder.read_i64_le("pruneidx size")?;

    if size != nwords + nlabels {
        return Err(LoadError::MalformedHeader(format!(
            "dictionary size {size} != {nwords} words + {nlabels} labels"
        )));
    }
    if pruneidx_size > 0 {
        return Err(LoadError::UnsupportedFormat(
            "pruned fastText models are not supported".to_string(),
        ));
    }

    let mut words = Vec::with_capacity(nwords);
    for _ in 0..size {
        let bytes = decoder.read_delimited(0, "dictionary word")?;
        decoder.read_i64_le("word count field")?;
        let entry_type = decoder.read_i8("entry type")?;
        if entry_type == ENTRY_WORD {
            words.push(String::from_utf8_lossy(bytes).into_owned());
        }
    }
    if words.len() != nwords {
        return Err(LoadError::MalformedHeader(format!(
            "dictionary declares {nwords} words, found {}",
            words.len()
        )));
    }
    Ok(words)
}

/// Replace each word's row with the mean of the word row and its n-gram
/// bucket rows, so an exact-match lookup returns the full fastText word
/// representation. `</s>` has no subwords and keeps its raw row.
fn precompute_word_rows(
    data: &mut [f32],
    words: &[String],
    indexer: &SubwordIndexer,
    dims: usize,
) {
    let nwords = words.len();
    for (i, word) in words.iter().enumerate() {
        if word == EOS {
            continue;
        }
        let slots = indexer.bucket_slots(word);
        if slots.is_empty() {
            continue;
        }
        let row_start = i * dims;
        let mut acc = data[row_start..row_start + dims].to_vec();
        for &slot in &slots {
            let bucket_start = (nwords + slot as usize) * dims;
            for (a, &component) in acc.iter_mut().zip(&data[bucket_start..bucket_start + dims]) {
                *a += component;
            }
        }
        let terms = (slots.len() + 1) as f32;
        for (out, a) in data[row_start..row_start + dims].iter_mut().zip(&acc) {
            *out = a / terms;
        }
    }
}

fn non_negative(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| LoadError::MalformedHeader(format!("negative {what}: {value}")))
}
