//! lexverdict - retrieval-augmented verdict assistant for the Indian
//! Penal Code.
//!
//! A case scenario is embedded once, matched against two LanceDB
//! collections (statute sections and precedent summaries), and the
//! retrieved context is handed to a generative model that writes a
//! structured court-style ruling with references back to the sources.

pub mod api;
pub mod cli;
pub mod cohere;
pub mod config;
pub mod ingest;
pub mod knowledge;
pub mod scraper;
pub mod verdict;

pub use config::AppConfig;
pub use verdict::{RulingResponse, VerdictError, VerdictOrchestrator};
