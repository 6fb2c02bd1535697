//! Lookup semantics: exact-match priority, subword fallback, norms, and
//! lock-free sharing across threads.

mod common;

use std::thread;

use common::{write_fixture, NativeFile};
use embed_reader::{Embeddings, LoadMode};
use tempfile::TempDir;

/// One in-vocabulary word plus eight distinguishable bucket rows.
fn subword_native(min_n: u32, max_n: u32) -> Vec<u8> {
    let buckets = 8usize;
    let dims = 2usize;
    let mut data = vec![5.0, 5.0]; // row for "cat"
    for bucket in 0..buckets {
        data.push(bucket as f32);
        data.push((bucket * 10) as f32);
    }
    NativeFile::new()
        .subword_vocab_chunk(&["cat"], min_n, max_n, buckets as u64)
        .matrix_chunk(1 + buckets, dims, &data)
        .bytes()
}

#[test]
fn oov_averages_its_bucket_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "sub.embr", &subword_native(2, 3));
    let embeddings = Embeddings::load(&path, LoadMode::OwnedCopy).expect("load");

    let rows = embeddings.vocab().subword_rows("dog");
    assert!(!rows.is_empty(), "expected n-grams for dog");

    // Recompute the mean from the known bucket contents in the same
    // accumulation order the engine uses.
    let mut expected = vec![0.0f32; 2];
    for &row in &rows {
        let bucket = row - 1; // one word row precedes the bucket block
        expected[0] += bucket as f32;
        expected[1] += (bucket * 10) as f32;
    }
    for component in &mut expected {
        *component /= rows.len() as f32;
    }

    let vector = embeddings.embedding("dog").expect("subword fallback");
    assert_eq!(vector.len(), embeddings.dimensions());
    assert_eq!(vector, expected);
}

#[test]
fn exact_match_wins_over_subwords() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "sub.embr", &subword_native(2, 3));
    let embeddings = Embeddings::load(&path, LoadMode::OwnedCopy).expect("load");

    // "cat" has plenty of n-grams, but the trained row must win.
    assert_eq!(embeddings.embedding("cat").unwrap(), vec![5.0, 5.0]);
}

#[test]
fn word_with_no_fitting_ngram_is_not_found() {
    let dir = TempDir::new().unwrap();
    // min_n 4: the bracketed "<a>" is three characters, so nothing fits.
    let path = write_fixture(&dir, "wide.embr", &subword_native(4, 5));
    let embeddings = Embeddings::load(&path, LoadMode::OwnedCopy).expect("load");

    assert!(embeddings.vocab().subword_rows("a").is_empty());
    assert!(embeddings.embedding("a").is_none());
}

#[test]
fn subword_lookup_identical_when_mapped() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "sub.embr", &subword_native(2, 3));

    let owned = Embeddings::load(&path, LoadMode::OwnedCopy).expect("owned");
    let mapped = Embeddings::load(&path, LoadMode::MemoryMapped).expect("mapped");
    for word in ["cat", "dog", "zebra"] {
        assert_eq!(owned.embedding(word), mapped.embedding(word), "{word}");
    }
}

#[test]
fn norms_chunk_is_exposed() {
    let dir = TempDir::new().unwrap();
    let bytes = NativeFile::new()
        .vocab_chunk(&["cat", "dog"])
        .matrix_chunk(2, 1, &[0.6, 0.8])
        .norms_chunk(&[1.25, 2.5])
        .bytes();
    let path = write_fixture(&dir, "normed.embr", &bytes);

    let embeddings = Embeddings::load(&path, LoadMode::OwnedCopy).expect("load");
    assert!(embeddings.metadata().normalized);
    assert_eq!(embeddings.norm("cat"), Some(1.25));
    assert_eq!(embeddings.norm("dog"), Some(2.5));
    assert_eq!(embeddings.norm("fish"), None);
}

#[test]
fn concurrent_lookups_agree() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "sub.embr", &subword_native(2, 3));
    let embeddings = Embeddings::load(&path, LoadMode::MemoryMapped).expect("load");

    let queries = ["cat", "dog", "fish", "zebra", "a"];
    let baseline: Vec<_> = queries.iter().map(|w| embeddings.embedding(w)).collect();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..100 {
                    for (word, expected) in queries.iter().zip(&baseline) {
                        assert_eq!(embeddings.embedding(word), *expected, "{word}");
                    }
                }
            });
        }
    });
}
