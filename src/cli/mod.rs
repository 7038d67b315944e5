//! CLI definition and command implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::api;
use crate::cohere::{CohereClient, CohereSettings};
use crate::config::{has_api_key, AppConfig};
use crate::ingest;
use crate::knowledge::{
    default_chunker, LancePrecedentStore, LanceStatuteStore, PrecedentStore, StatuteStore,
};
use crate::scraper::{write_csv, CaseScraper, ScraperConfig};
use crate::verdict::{VerdictError, VerdictOptions, VerdictOrchestrator};

/// LanceDB directory name under the data dir.
const DB_DIR_NAME: &str = "verdict.lance";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "lexverdict")]
#[command(version, about = "IPC verdict assistant over statute and precedent search", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask for a ruling on a case scenario
    Ask {
        /// Case scenario in plain language
        query: String,
    },

    /// Run the HTTP server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Load a statute PDF into the statute collection
    IngestStatutes {
        /// Path to the IPC PDF
        pdf: PathBuf,
    },

    /// Load scraped case CSVs into the precedent collection
    IngestPrecedents {
        /// Directory containing ipc_*_cases.csv files
        dir: PathBuf,
    },

    /// Scrape case law for an IPC section into a CSV
    Scrape {
        /// IPC section number (e.g. 302, 392)
        section: String,

        /// Search result pages to walk
        #[arg(long, default_value = "3")]
        pages: usize,

        /// Maximum cases to scrape
        #[arg(long, default_value = "20")]
        max_cases: usize,

        /// Output directory for the CSV
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Drop a knowledge collection
    Reset {
        /// Collection to drop
        collection: ResetTarget,
    },

    /// Show configuration and collection status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResetTarget {
    Statutes,
    Precedents,
    All,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// Execute the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask { query } => cmd_ask(&query).await,
        Commands::Serve { host, port } => cmd_serve(&host, port).await,
        Commands::IngestStatutes { pdf } => cmd_ingest_statutes(&pdf).await,
        Commands::IngestPrecedents { dir } => cmd_ingest_precedents(&dir).await,
        Commands::Scrape {
            section,
            pages,
            max_cases,
            output,
        } => cmd_scrape(&section, pages, max_cases, &output).await,
        Commands::Reset { collection } => cmd_reset(collection).await,
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Component Wiring
// ============================================================================

fn db_path(config: &AppConfig) -> PathBuf {
    config.data_dir.join(DB_DIR_NAME)
}

async fn open_statute_store(config: &AppConfig) -> Result<LanceStatuteStore> {
    LanceStatuteStore::open(&db_path(config), config.embedding_dimension)
        .await
        .context("Failed to open statute collection")
}

async fn open_precedent_store(config: &AppConfig) -> Result<LancePrecedentStore> {
    LancePrecedentStore::open(&db_path(config), config.embedding_dimension)
        .await
        .context("Failed to open precedent collection")
}

fn cohere_client(config: &AppConfig) -> Result<CohereClient> {
    CohereClient::new(CohereSettings::from_config(config)).context("Failed to create Cohere client")
}

async fn build_orchestrator(config: &AppConfig) -> Result<VerdictOrchestrator> {
    let client = Arc::new(cohere_client(config)?);
    let statutes = open_statute_store(config).await?;
    let precedents = open_precedent_store(config).await?;

    Ok(VerdictOrchestrator::new(
        client.clone(),
        client,
        Arc::new(statutes),
        Arc::new(precedents),
        VerdictOptions::from(config),
    ))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Single-query ruling (ask).
async fn cmd_ask(query: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    let orchestrator = build_orchestrator(&config).await?;

    println!("[*] Analyzing case scenario...");

    let response = match orchestrator.handle(query).await {
        Ok(response) => response,
        Err(VerdictError::EmptyQuery) => {
            println!("[!] Query cannot be empty");
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!(e.to_string())),
    };

    println!();
    println!("{}", response.answer);

    if !response.references.is_empty() {
        println!();
        println!("References:");
        for reference in &response.references {
            println!("  - {}", reference);
        }
    }

    if !response.precedent_references.is_empty() {
        println!();
        println!("Precedent References:");
        for reference in &response.precedent_references {
            println!("  - {}", reference);
        }
    }

    Ok(())
}

/// HTTP server (serve).
async fn cmd_serve(host: &str, port: u16) -> Result<()> {
    let config = AppConfig::from_env()?;
    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    println!("[OK] Listening on http://{}:{}", host, port);
    api::serve(orchestrator, host, port).await
}

/// Statute PDF loader (ingest-statutes).
async fn cmd_ingest_statutes(pdf: &PathBuf) -> Result<()> {
    let config = AppConfig::from_env()?;
    let client = cohere_client(&config)?;
    let store = open_statute_store(&config).await?;
    let chunker = default_chunker();

    println!("[*] Ingesting statute PDF: {}", pdf.display());

    let stored = ingest::load_statutes(&client, &store, chunker.as_ref(), pdf).await?;

    if stored == 0 {
        println!("[!] No statute chunks were stored");
    } else {
        println!("[OK] Stored {} statute chunks", stored);
    }

    Ok(())
}

/// Precedent CSV loader (ingest-precedents).
async fn cmd_ingest_precedents(dir: &PathBuf) -> Result<()> {
    let config = AppConfig::from_env()?;
    let client = cohere_client(&config)?;
    let store = open_precedent_store(&config).await?;

    println!("[*] Ingesting case files from: {}", dir.display());

    let stored = ingest::load_precedents(&client, &store, dir).await?;

    if stored == 0 {
        println!("[!] No precedent cases were stored");
    } else {
        println!("[OK] Stored {} precedent cases", stored);
    }

    Ok(())
}

/// Case-law scraper (scrape). Does not need an API key.
async fn cmd_scrape(section: &str, pages: usize, max_cases: usize, output: &PathBuf) -> Result<()> {
    let scraper = CaseScraper::new(ScraperConfig {
        pages,
        max_cases,
        ..Default::default()
    })?;

    println!("[*] Scraping cases for IPC {}...", section);

    let cases = scraper.scrape_section(section).await?;
    if cases.is_empty() {
        println!("[!] No cases found for IPC {}", section);
        return Ok(());
    }

    let path = output.join(format!("ipc_{}_cases.csv", section));
    write_csv(&cases, &path)?;

    println!("[OK] Wrote {} cases to {}", cases.len(), path.display());
    Ok(())
}

/// Collection reset (reset).
async fn cmd_reset(target: ResetTarget) -> Result<()> {
    let config = AppConfig::from_env()?;

    if matches!(target, ResetTarget::Statutes | ResetTarget::All) {
        let store = open_statute_store(&config).await?;
        store.reset().await?;
        println!("[OK] Statute collection dropped");
    }

    if matches!(target, ResetTarget::Precedents | ResetTarget::All) {
        let store = open_precedent_store(&config).await?;
        store.reset().await?;
        println!("[OK] Precedent collection dropped");
    }

    Ok(())
}

/// System status (status).
async fn cmd_status() -> Result<()> {
    println!("lexverdict v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if has_api_key() {
        println!("[OK] API key: configured");
    } else {
        println!("[!] API key: not set");
        println!("    Set it with: export COHERE_API_KEY=your-key");
    }

    // Collection counts work without an API key; the stores are local.
    let data_dir = std::env::var("LEXVERDICT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| crate::config::default_data_dir());
    println!("[*] Data directory: {}", data_dir.display());

    let db_path = data_dir.join(DB_DIR_NAME);
    let dimension = crate::config::DEFAULT_EMBEDDING_DIMENSION;

    match LanceStatuteStore::open(&db_path, dimension).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("[OK] Statute chunks: {}", count),
            Err(e) => println!("[!] Statute count failed: {}", e),
        },
        Err(e) => println!("[!] Statute collection unavailable: {}", e),
    }

    match LancePrecedentStore::open(&db_path, dimension).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("[OK] Precedent cases: {}", count),
            Err(e) => println!("[!] Precedent count failed: {}", e),
        },
        Err(e) => println!("[!] Precedent collection unavailable: {}", e),
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
