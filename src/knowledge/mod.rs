//! Knowledge bases: vector collections and ingestion-side chunking.

pub mod chunker;
pub mod lance;
pub mod vector;

pub use chunker::{default_chunker, ChunkConfig, Chunker, SentenceChunker};
pub use lance::{LancePrecedentStore, LanceStatuteStore};
pub use vector::{
    PrecedentEntry, PrecedentRecord, PrecedentStore, StatuteEntry, StatuteRecord, StatuteStore,
};
