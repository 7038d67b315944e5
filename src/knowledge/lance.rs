//! LanceDB-backed vector collections
//!
//! Two tables live under one LanceDB directory: `statutes` and
//! `precedents`. Both store Arrow records with a FixedSizeList embedding
//! column supplied by the caller at write time.
//!
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase, Select};

use super::vector::{
    PrecedentEntry, PrecedentRecord, PrecedentStore, StatuteEntry, StatuteRecord, StatuteStore,
};

/// Statute table name.
const STATUTE_TABLE: &str = "statutes";

/// Precedent table name.
const PRECEDENT_TABLE: &str = "precedents";

// ============================================================================
// Connection Helpers
// ============================================================================

/// Open (creating if needed) the LanceDB directory.
async fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create LanceDB directory")?;
        }
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

    lancedb::connect(path_str)
        .execute()
        .await
        .context("Failed to connect to LanceDB")
}

async fn table_exists(db: &Connection, name: &str) -> bool {
    db.table_names()
        .execute()
        .await
        .map(|names| names.iter().any(|n| n == name))
        .unwrap_or(false)
}

/// Flatten per-row embeddings into a FixedSizeList column.
fn embedding_column(embeddings: &[&[f32]], dimension: i32) -> Result<FixedSizeListArray> {
    let flat: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let values = Float32Array::from(flat);
    let field = Arc::new(Field::new("item", DataType::Float32, true));

    FixedSizeListArray::try_new(field, dimension, Arc::new(values) as Arc<dyn Array>, None)
        .context("Failed to create embedding array")
}

fn embedding_field(dimension: i32) -> Field {
    Field::new(
        "embedding",
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimension,
        ),
        false,
    )
}

/// Append the batch to an existing table, or create the table from it.
async fn append_or_create(db: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();

    if table_exists(db, name).await {
        let table = db
            .open_table(name)
            .execute()
            .await
            .with_context(|| format!("Failed to open table '{}'", name))?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(batches)
            .execute()
            .await
            .with_context(|| format!("Failed to add rows to table '{}'", name))?;
    } else {
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        db.create_table(name, batches)
            .execute()
            .await
            .with_context(|| format!("Failed to create table '{}'", name))?;
    }

    Ok(())
}

async fn table_count(db: &Connection, name: &str) -> Result<usize> {
    if !table_exists(db, name).await {
        return Ok(0);
    }

    let table = db
        .open_table(name)
        .execute()
        .await
        .with_context(|| format!("Failed to open table '{}'", name))?;

    table
        .count_rows(None)
        .await
        .with_context(|| format!("Failed to count rows in '{}'", name))
}

async fn drop_table(db: &Connection, name: &str) -> Result<()> {
    if !table_exists(db, name).await {
        return Ok(());
    }

    db.drop_table(name)
        .await
        .with_context(|| format!("Failed to drop table '{}'", name))
}

/// Run a nearest-neighbor search projecting the given columns.
async fn vector_query(
    db: &Connection,
    name: &str,
    query_embedding: &[f32],
    limit: usize,
    columns: &[&str],
) -> Result<Vec<RecordBatch>> {
    if !table_exists(db, name).await {
        return Ok(vec![]);
    }

    let table = db
        .open_table(name)
        .execute()
        .await
        .with_context(|| format!("Failed to open table '{}' for search", name))?;

    let stream = table
        .vector_search(query_embedding.to_vec())
        .context("Failed to create vector search")?
        .limit(limit)
        .select(Select::columns(columns))
        .execute()
        .await
        .context("Failed to execute vector search")?;

    let batches: Vec<RecordBatch> = stream
        .try_collect()
        .await
        .context("Failed to read search results")?;

    Ok(batches)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow::anyhow!("Missing {} column", name))
}

// ============================================================================
// LanceStatuteStore
// ============================================================================

/// Statute-section collection backed by LanceDB.
pub struct LanceStatuteStore {
    db: Connection,
    dimension: i32,
}

impl LanceStatuteStore {
    /// Open the store at the given LanceDB directory.
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        let db = connect(path).await?;
        Ok(Self {
            db,
            dimension: dimension as i32,
        })
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            embedding_field(self.dimension),
        ])
    }

    fn entries_to_batch(&self, entries: &[StatuteEntry]) -> Result<RecordBatch> {
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        let embeddings: Vec<&[f32]> = entries.iter().map(|e| e.embedding.as_slice()).collect();

        let batch = RecordBatch::try_new(
            Arc::new(self.schema()),
            vec![
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(sources)),
                Arc::new(embedding_column(&embeddings, self.dimension)?),
            ],
        )
        .context("Failed to create statute RecordBatch")?;

        Ok(batch)
    }
}

#[async_trait]
impl StatuteStore for LanceStatuteStore {
    async fn insert_batch(&self, entries: &[StatuteEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        append_or_create(&self.db, STATUTE_TABLE, batch).await?;
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<StatuteRecord>> {
        let batches = vector_query(
            &self.db,
            STATUTE_TABLE,
            query_embedding,
            limit,
            &["text", "source"],
        )
        .await?;

        let mut records = Vec::new();
        for batch in batches {
            let texts = string_column(&batch, "text")?;
            let sources = string_column(&batch, "source")?;

            for i in 0..batch.num_rows() {
                records.push(StatuteRecord {
                    text: texts.value(i).to_string(),
                    source: sources.value(i).to_string(),
                });
            }
        }

        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        table_count(&self.db, STATUTE_TABLE).await
    }

    async fn reset(&self) -> Result<()> {
        drop_table(&self.db, STATUTE_TABLE).await
    }
}

// ============================================================================
// LancePrecedentStore
// ============================================================================

/// Precedent-case collection backed by LanceDB.
pub struct LancePrecedentStore {
    db: Connection,
    dimension: i32,
}

impl LancePrecedentStore {
    /// Open the store at the given LanceDB directory.
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        let db = connect(path).await?;
        Ok(Self {
            db,
            dimension: dimension as i32,
        })
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("case_summary", DataType::Utf8, false),
            Field::new("case_name", DataType::Utf8, false),
            Field::new("citation", DataType::Utf8, false),
            embedding_field(self.dimension),
        ])
    }

    fn entries_to_batch(&self, entries: &[PrecedentEntry]) -> Result<RecordBatch> {
        let summaries: Vec<&str> = entries.iter().map(|e| e.case_summary.as_str()).collect();
        let names: Vec<&str> = entries.iter().map(|e| e.case_name.as_str()).collect();
        let citations: Vec<&str> = entries.iter().map(|e| e.citation.as_str()).collect();
        let embeddings: Vec<&[f32]> = entries.iter().map(|e| e.embedding.as_slice()).collect();

        let batch = RecordBatch::try_new(
            Arc::new(self.schema()),
            vec![
                Arc::new(StringArray::from(summaries)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(citations)),
                Arc::new(embedding_column(&embeddings, self.dimension)?),
            ],
        )
        .context("Failed to create precedent RecordBatch")?;

        Ok(batch)
    }
}

#[async_trait]
impl PrecedentStore for LancePrecedentStore {
    async fn insert_batch(&self, entries: &[PrecedentEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        append_or_create(&self.db, PRECEDENT_TABLE, batch).await?;
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<PrecedentRecord>> {
        let batches = vector_query(
            &self.db,
            PRECEDENT_TABLE,
            query_embedding,
            limit,
            &["case_summary", "case_name", "citation"],
        )
        .await?;

        let mut records = Vec::new();
        for batch in batches {
            let summaries = string_column(&batch, "case_summary")?;
            let names = string_column(&batch, "case_name")?;
            let citations = string_column(&batch, "citation")?;

            for i in 0..batch.num_rows() {
                records.push(PrecedentRecord {
                    case_summary: summaries.value(i).to_string(),
                    case_name: names.value(i).to_string(),
                    citation: citations.value(i).to_string(),
                });
            }
        }

        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        table_count(&self.db, PRECEDENT_TABLE).await
    }

    async fn reset(&self) -> Result<()> {
        drop_table(&self.db, PRECEDENT_TABLE).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_DIM: usize = 4;

    fn statute_entry(text: &str, source: &str, fill: f32) -> StatuteEntry {
        StatuteEntry {
            text: text.to_string(),
            source: source.to_string(),
            embedding: vec![fill; TEST_DIM],
        }
    }

    fn precedent_entry(name: &str, fill: f32) -> PrecedentEntry {
        PrecedentEntry {
            case_summary: format!("Summary of {}", name),
            case_name: name.to_string(),
            citation: "AIR 2001 SC 1".to_string(),
            embedding: vec![fill; TEST_DIM],
        }
    }

    #[tokio::test]
    async fn test_statute_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.lance");

        let store = LanceStatuteStore::open(&path, TEST_DIM).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let entries = vec![
            statute_entry("Section 378. Theft.", "ipc.pdf", 0.1),
            statute_entry("Section 442. House-trespass.", "ipc.pdf", 0.9),
        ];
        assert_eq!(store.insert_batch(&entries).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.search(&vec![0.1; TEST_DIM], 3).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 3);
        assert_eq!(results[0].text, "Section 378. Theft.");
        assert_eq!(results[0].source, "ipc.pdf");
    }

    #[tokio::test]
    async fn test_statute_search_on_missing_table_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.lance");

        let store = LanceStatuteStore::open(&path, TEST_DIM).await.unwrap();
        let results = store.search(&vec![0.5; TEST_DIM], 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_precedent_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.lance");

        let store = LancePrecedentStore::open(&path, TEST_DIM).await.unwrap();

        let entries = vec![
            precedent_entry("State v. A", 0.2),
            precedent_entry("State v. B", 0.8),
        ];
        assert_eq!(store.insert_batch(&entries).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.search(&vec![0.2; TEST_DIM], 2).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].case_name, "State v. A");
        assert!(results[0].case_summary.contains("State v. A"));
    }

    #[tokio::test]
    async fn test_reset_drops_all_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.lance");

        let store = LancePrecedentStore::open(&path, TEST_DIM).await.unwrap();
        store
            .insert_batch(&[precedent_entry("State v. C", 0.3)])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        // Reset on an already-missing table is fine.
        store.reset().await.unwrap();
    }

    #[tokio::test]
    async fn test_both_tables_share_one_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("verdict.lance");

        let statutes = LanceStatuteStore::open(&path, TEST_DIM).await.unwrap();
        let precedents = LancePrecedentStore::open(&path, TEST_DIM).await.unwrap();

        statutes
            .insert_batch(&[statute_entry("Section 1.", "ipc.pdf", 0.1)])
            .await
            .unwrap();
        precedents
            .insert_batch(&[precedent_entry("State v. D", 0.1)])
            .await
            .unwrap();

        assert_eq!(statutes.count().await.unwrap(), 1);
        assert_eq!(precedents.count().await.unwrap(), 1);
    }
}
