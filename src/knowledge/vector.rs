//! Vector collection types and traits
//!
//! The assistant reads from two independently populated collections:
//! statute sections and precedent cases. Both carry externally computed
//! embeddings - there is no server-side vectorization anywhere.
//!
//! Searches return records ordered by descending similarity. Zero matches
//! is a valid outcome, never an error; only a failing search call is.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// A statute-section record as read back from the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatuteRecord {
    /// Section body text.
    pub text: String,
    /// Where the section came from (typically the source PDF file name).
    pub source: String,
}

/// A precedent-case record as read back from the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrecedentRecord {
    /// Case summary / headnotes.
    pub case_summary: String,
    /// Case name.
    pub case_name: String,
    /// Citation string.
    pub citation: String,
}

/// A statute record plus its embedding, for insertion.
#[derive(Debug, Clone)]
pub struct StatuteEntry {
    pub text: String,
    pub source: String,
    pub embedding: Vec<f32>,
}

/// A precedent record plus its embedding, for insertion.
#[derive(Debug, Clone)]
pub struct PrecedentEntry {
    pub case_summary: String,
    pub case_name: String,
    pub citation: String,
    pub embedding: Vec<f32>,
}

// ============================================================================
// Store Traits
// ============================================================================

/// Statute-section collection.
#[async_trait]
pub trait StatuteStore: Send + Sync {
    /// Insert a batch of entries with precomputed embeddings.
    async fn insert_batch(&self, entries: &[StatuteEntry]) -> Result<usize>;

    /// Nearest-neighbor search, at most `limit` records, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<StatuteRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Drop all records.
    async fn reset(&self) -> Result<()>;
}

/// Precedent-case collection.
#[async_trait]
pub trait PrecedentStore: Send + Sync {
    /// Insert a batch of entries with precomputed embeddings.
    async fn insert_batch(&self, entries: &[PrecedentEntry]) -> Result<usize>;

    /// Nearest-neighbor search, at most `limit` records, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<PrecedentRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Drop all records.
    async fn reset(&self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statute_record_json_shape() {
        let record = StatuteRecord {
            text: "Whoever commits theft...".to_string(),
            source: "punishments.pdf".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "punishments.pdf");
        assert!(json["text"].as_str().unwrap().starts_with("Whoever"));
    }

    #[test]
    fn test_precedent_record_json_shape() {
        let record = PrecedentRecord {
            case_summary: "The accused broke into...".to_string(),
            case_name: "State v. Example".to_string(),
            citation: "AIR 1990 SC 123".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["case_name"], "State v. Example");
        assert_eq!(json["citation"], "AIR 1990 SC 123");
    }
}
