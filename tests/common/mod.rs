//! Fixture builders shared by the integration tests.
//!
//! Fixtures are assembled byte-by-byte and written to a temp directory, so
//! every structural property of a file (padding, chunk lengths, record
//! layout) is under the test's control.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::TempDir;

pub const NATIVE_VERSION: u32 = 1;

pub const CHUNK_VOCAB: u32 = 1;
pub const CHUNK_SUBWORD_VOCAB: u32 = 2;
pub const CHUNK_MATRIX: u32 = 3;
pub const CHUNK_NORMS: u32 = 4;

/// Incrementally assembled native `EMBR` container.
pub struct NativeFile {
    buf: Vec<u8>,
}

impl NativeFile {
    pub fn new() -> Self {
        Self::with_version(NATIVE_VERSION)
    }

    pub fn with_version(version: u32) -> Self {
        let mut buf = b"EMBR".to_vec();
        buf.write_u32::<LittleEndian>(version).unwrap();
        NativeFile { buf }
    }

    pub fn vocab_chunk(self, words: &[&str]) -> Self {
        let payload = encode_words(words);
        self.raw_chunk(CHUNK_VOCAB, &payload)
    }

    pub fn subword_vocab_chunk(
        self,
        words: &[&str],
        min_n: u32,
        max_n: u32,
        buckets: u64,
    ) -> Self {
        let mut payload = Vec::new();
        payload.write_u32::<LittleEndian>(min_n).unwrap();
        payload.write_u32::<LittleEndian>(max_n).unwrap();
        payload.write_u64::<LittleEndian>(buckets).unwrap();
        payload.extend_from_slice(&encode_words(words));
        self.raw_chunk(CHUNK_SUBWORD_VOCAB, &payload)
    }

    /// Matrix chunk with correct in-file alignment padding for the floats.
    pub fn matrix_chunk(self, rows: usize, dims: usize, data: &[f32]) -> Self {
        assert_eq!(data.len(), rows * dims, "fixture matrix shape mismatch");
        // Floats start after the chunk header (12 bytes) and the row/dim
        // fields (12 bytes); pad so their absolute offset is 4-aligned.
        let float_offset = self.buf.len() + 12 + 12;
        let padding = (4 - float_offset % 4) % 4;

        let mut payload = Vec::new();
        payload.write_u64::<LittleEndian>(rows as u64).unwrap();
        payload.write_u32::<LittleEndian>(dims as u32).unwrap();
        payload.extend(std::iter::repeat(0u8).take(padding));
        for &value in data {
            payload.write_f32::<LittleEndian>(value).unwrap();
        }
        self.raw_chunk(CHUNK_MATRIX, &payload)
    }

    pub fn norms_chunk(self, norms: &[f32]) -> Self {
        let mut payload = Vec::new();
        payload.write_u64::<LittleEndian>(norms.len() as u64).unwrap();
        for &value in norms {
            payload.write_f32::<LittleEndian>(value).unwrap();
        }
        self.raw_chunk(CHUNK_NORMS, &payload)
    }

    pub fn raw_chunk(mut self, id: u32, payload: &[u8]) -> Self {
        self.buf.write_u32::<LittleEndian>(id).unwrap();
        self.buf
            .write_u64::<LittleEndian>(payload.len() as u64)
            .unwrap();
        self.buf.extend_from_slice(payload);
        self
    }

    pub fn bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn encode_words(words: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.write_u64::<LittleEndian>(words.len() as u64).unwrap();
    for word in words {
        payload
            .write_u32::<LittleEndian>(word.len() as u32)
            .unwrap();
        payload.extend_from_slice(word.as_bytes());
    }
    payload
}

/// word2vec binary bytes with an explicit header, so header/record count
/// disagreements can be fabricated.
pub fn word2vec_bytes(vocab_size: usize, dims: usize, entries: &[(&str, &[f32])]) -> Vec<u8> {
    let mut buf = format!("{} {}\n", vocab_size, dims).into_bytes();
    for (word, vector) in entries {
        buf.extend_from_slice(word.as_bytes());
        buf.push(b' ');
        for &value in *vector {
            buf.write_f32::<LittleEndian>(value).unwrap();
        }
        buf.push(b'\n');
    }
    buf
}

/// Minimal fastText model: `words` rows followed by `bucket` rows all set
/// to `bucket_row`.
pub struct FastTextModel<'a> {
    pub dim: usize,
    pub min_n: i32,
    pub max_n: i32,
    pub bucket: usize,
    pub words: &'a [(&'a str, &'a [f32])],
    pub bucket_row: &'a [f32],
    pub version: i32,
    pub quantized: bool,
    pub pruneidx_size: i64,
}

impl<'a> FastTextModel<'a> {
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_i32::<LittleEndian>(793_712_314).unwrap();
        buf.write_i32::<LittleEndian>(self.version).unwrap();

        // args: dim, ws, epoch, min_count, neg, word_ngrams, loss, model,
        // bucket, min_n, max_n, lr_update_rate, t
        buf.write_i32::<LittleEndian>(self.dim as i32).unwrap();
        for default in [5, 5, 5, 5, 1, 1] {
            buf.write_i32::<LittleEndian>(default).unwrap();
        }
        buf.write_i32::<LittleEndian>(2).unwrap(); // skipgram
        buf.write_i32::<LittleEndian>(self.bucket as i32).unwrap();
        buf.write_i32::<LittleEndian>(self.min_n).unwrap();
        buf.write_i32::<LittleEndian>(self.max_n).unwrap();
        buf.write_i32::<LittleEndian>(100).unwrap();
        buf.write_f64::<LittleEndian>(1e-4).unwrap();

        // dictionary
        let nwords = self.words.len() as i32;
        buf.write_i32::<LittleEndian>(nwords).unwrap();
        buf.write_i32::<LittleEndian>(nwords).unwrap();
        buf.write_i32::<LittleEndian>(0).unwrap(); // nlabels
        buf.write_i64::<LittleEndian>(100).unwrap(); // ntokens
        buf.write_i64::<LittleEndian>(self.pruneidx_size).unwrap();
        for (word, _) in self.words {
            buf.extend_from_slice(word.as_bytes());
            buf.push(0);
            buf.write_i64::<LittleEndian>(1).unwrap(); // count
            buf.write_i8(0).unwrap(); // entry type: word
        }

        buf.push(u8::from(self.quantized));

        // input matrix
        let rows = self.words.len() + self.bucket;
        buf.write_i64::<LittleEndian>(rows as i64).unwrap();
        buf.write_i64::<LittleEndian>(self.dim as i64).unwrap();
        for (_, vector) in self.words {
            assert_eq!(vector.len(), self.dim, "fixture word row shape mismatch");
            for &value in *vector {
                buf.write_f32::<LittleEndian>(value).unwrap();
            }
        }
        assert_eq!(self.bucket_row.len(), self.dim);
        for _ in 0..self.bucket {
            for &value in self.bucket_row {
                buf.write_f32::<LittleEndian>(value).unwrap();
            }
        }
        buf
    }
}

pub fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}
