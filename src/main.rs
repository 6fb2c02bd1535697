use std::env;
use std::process;

use embed_reader::{Embeddings, LoadMode};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path> [--format native|word2vec|text|text-dims|fasttext] [--mmap] [word ...]",
            args[0]
        );
        process::exit(1);
    }

    let path = &args[1];
    let mut format = "native".to_string();
    let mut mmap = false;
    let mut queries: Vec<&String> = Vec::new();

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--format" => match rest.next() {
                Some(value) => format = value.clone(),
                None => {
                    eprintln!("ERROR: --format flag requires an argument.");
                    process::exit(1);
                }
            },
            "--mmap" => mmap = true,
            _ => queries.push(arg),
        }
    }

    println!("Reading embedding file: {}", path);
    println!("{}", "=".repeat(60));

    let result = match format.as_str() {
        "native" => {
            let mode = if mmap {
                LoadMode::MemoryMapped
            } else {
                LoadMode::OwnedCopy
            };
            Embeddings::load(path, mode)
        }
        "word2vec" => Embeddings::load_word2vec(path),
        "text" => Embeddings::load_text(path),
        "text-dims" => Embeddings::load_text_with_dims(path),
        "fasttext" => Embeddings::load_fasttext(path),
        other => {
            eprintln!("ERROR: Unknown format: {}", other);
            process::exit(1);
        }
    };

    let embeddings = match result {
        Ok(embeddings) => embeddings,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("Words:      {}", embeddings.len());
    println!("Dimensions: {}", embeddings.dimensions());
    println!("Metadata:   {:?}", embeddings.metadata());

    for word in queries {
        match embeddings.embedding(word) {
            Some(vector) => println!("{}: {:?}", word, vector),
            None => println!("{}: not found", word),
        }
    }
}
