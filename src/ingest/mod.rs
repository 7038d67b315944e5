//! Offline loaders - populate the two vector collections
//!
//! Statutes come from a PDF (extract, chunk, embed, insert); precedents
//! come from scraped `ipc_*_cases.csv` files. Both paths embed in small
//! batches with `input_type: search_document` and tolerate individual
//! batch failures: a batch that still fails after the retry policy is
//! skipped with a warning rather than aborting the whole load.

pub mod pdf;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cohere::EmbeddingProvider;
use crate::knowledge::{Chunker, PrecedentEntry, PrecedentStore, StatuteEntry, StatuteStore};

/// Texts embedded per API call during bulk loading.
const EMBED_BATCH_SIZE: usize = 10;

// ============================================================================
// Statute Loader
// ============================================================================

/// Load a statute PDF into the statute collection.
///
/// Returns the number of chunks stored. The `source` property of every
/// record is the PDF file name.
pub async fn load_statutes(
    embedder: &dyn EmbeddingProvider,
    store: &dyn StatuteStore,
    chunker: &dyn Chunker,
    pdf_path: &Path,
) -> Result<usize> {
    tracing::info!("Extracting text from: {}", pdf_path.display());
    let text = pdf::extract_text(pdf_path)?;

    let chunks = chunker.chunk(&text);
    if chunks.is_empty() {
        tracing::warn!("No chunks produced from {}", pdf_path.display());
        return Ok(0);
    }
    tracing::info!("Extracted {} text chunks", chunks.len());

    let source = pdf_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.pdf")
        .to_string();

    let mut stored = 0;

    for (batch_num, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
        let embeddings = match embedder.embed_documents(batch).await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Batch {} failed, skipping: {}", batch_num + 1, e);
                continue;
            }
        };

        let entries: Vec<StatuteEntry> = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StatuteEntry {
                text: chunk.clone(),
                source: source.clone(),
                embedding,
            })
            .collect();

        stored += store
            .insert_batch(&entries)
            .await
            .context("Failed to insert statute chunks")?;

        tracing::debug!("Batch {} stored ({} total)", batch_num + 1, stored);
    }

    tracing::info!("Stored {} statute chunks from {}", stored, source);
    Ok(stored)
}

// ============================================================================
// Precedent Loader
// ============================================================================

/// One row of a scraped precedent CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct PrecedentRow {
    pub case_name: String,
    pub citation: String,
    #[serde(default)]
    pub link: String,
    pub summary_text: String,
}

/// Find scraped case files (`ipc_*_cases.csv`) in a directory.
pub fn find_case_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
    {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        if name.starts_with("ipc_") && name.ends_with("_cases.csv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Read precedent rows from one CSV, dropping rows with blank summaries
/// (they cannot be embedded).
pub fn read_case_file(path: &Path) -> Result<Vec<PrecedentRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV: {:?}", path))?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<PrecedentRow>() {
        let row = record.with_context(|| format!("Malformed row in {:?}", path))?;
        if row.summary_text.trim().is_empty() {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Load every `ipc_*_cases.csv` in a directory into the precedent
/// collection. Returns the number of cases stored.
pub async fn load_precedents(
    embedder: &dyn EmbeddingProvider,
    store: &dyn PrecedentStore,
    dir: &Path,
) -> Result<usize> {
    let files = find_case_files(dir)?;
    if files.is_empty() {
        anyhow::bail!("No ipc_*_cases.csv files found in {:?}", dir);
    }
    tracing::info!("Found {} case files to process", files.len());

    let mut stored = 0;

    for file in &files {
        let rows = match read_case_file(file) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                continue;
            }
        };

        if rows.is_empty() {
            tracing::info!("No valid case summaries in {:?}", file);
            continue;
        }
        tracing::info!("Processing {} cases from {:?}", rows.len(), file);

        for (batch_num, batch) in rows.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|r| r.summary_text.clone()).collect();

            let embeddings = match embedder.embed_documents(&texts).await {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Batch {} failed, skipping: {}", batch_num + 1, e);
                    continue;
                }
            };

            if embeddings.len() != batch.len() {
                tracing::warn!(
                    "Mismatch between cases ({}) and embeddings ({}), skipping batch",
                    batch.len(),
                    embeddings.len()
                );
                continue;
            }

            let entries: Vec<PrecedentEntry> = batch
                .iter()
                .zip(embeddings)
                .map(|(row, embedding)| PrecedentEntry {
                    case_summary: row.summary_text.clone(),
                    case_name: row.case_name.clone(),
                    citation: row.citation.clone(),
                    embedding,
                })
                .collect();

            stored += store
                .insert_batch(&entries)
                .await
                .context("Failed to insert precedent cases")?;
        }
    }

    tracing::info!("Stored {} precedent cases", stored);
    Ok(stored)
}

// ============================================================================
// Tests
// ============================================================================
