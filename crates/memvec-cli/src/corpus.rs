//! JSONL loaders for corpora and query embedding tables.
//!
//! Corpus line:   `{"content": "...", "metadata": {...}, "embedding": [..]}`
//! Table line:    `{"text": "...", "embedding": [..]}`

use std::path::Path;

use anyhow::{bail, Context};
use memvec_core::{metadata_from_json, NewRecord};
use memvec_embed::FixedEmbedder;
use memvec_store::DocumentStore;
use ndarray::Array1;
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct CorpusLine {
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct TableLine {
    text: String,
    embedding: Vec<f64>,
}

fn parse_lines<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: malformed line", path.display(), n + 1))
        })
        .collect()
}

/// Load a corpus file into a fresh store. The whole file is rejected if
/// any line is malformed or has the wrong dimension.
pub fn load_corpus(path: &Path) -> anyhow::Result<DocumentStore> {
    let lines: Vec<CorpusLine> = parse_lines(path)?;

    let records = lines
        .into_iter()
        .map(|line| -> memvec_core::Result<NewRecord> {
            Ok(NewRecord {
                content: line.content,
                metadata: metadata_from_json(line.metadata)?,
                embedding: Array1::from(line.embedding),
            })
        })
        .collect::<memvec_core::Result<Vec<_>>>()
        .with_context(|| format!("Invalid metadata in {}", path.display()))?;

    let store = DocumentStore::new();
    store
        .insert_batch(records)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    info!(
        "Loaded {} records from {} (dim={:?})",
        store.count(),
        path.display(),
        store.dimension()
    );
    Ok(store)
}

/// Load a text→vector table into a [`FixedEmbedder`].
pub fn load_embedding_table(path: &Path) -> anyhow::Result<FixedEmbedder> {
    let lines: Vec<TableLine> = parse_lines(path)?;
    let Some(first) = lines.first() else {
        bail!("{} contains no embeddings", path.display());
    };

    let mut embedder = FixedEmbedder::new(first.embedding.len());
    for line in lines {
        let text = line.text.clone();
        embedder
            .insert(line.text, Array1::from(line.embedding))
            .with_context(|| format!("Bad embedding for {:?}", text))?;
    }
    Ok(embedder)
}
