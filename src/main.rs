//! # ragchat CLI
//!
//! The `ragchat` binary drives the retrieval-augmented chat engine: database
//! initialization, document ingestion, question answering, and document and
//! session management.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat init` | Create the SQLite database and run schema migrations |
//! | `ragchat ingest <file>` | Ingest a PDF or text file for an owner |
//! | `ragchat ask "<question>"` | Answer a question from the owner's corpus |
//! | `ragchat status <doc-id>` | Show a document's processing status |
//! | `ragchat documents` | List an owner's documents |
//! | `ragchat delete <doc-id>` | Delete a document and its passages |
//! | `ragchat history <session>` | Print a session's transcript |
//!
//! ## Examples
//!
//! ```bash
//! ragchat init --config ./config/ragchat.toml
//! ragchat ingest report.pdf --owner alice
//! ragchat ask "what does the report conclude?" --owner alice --session s1
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ragchat::config::{load_config, Config};
use ragchat::db;
use ragchat::embedding::OllamaEmbedder;
use ragchat::extract::{content_type_for, extract_text};
use ragchat::generation::OllamaGenerator;
use ragchat::index::SqliteIndex;
use ragchat::migrate;
use ragchat::models::DocumentStatus;
use ragchat::rag::RagEngine;
use ragchat::store::{SqliteDocumentStore, SqliteHistoryStore};

/// ragchat — a retrieval-augmented chat engine for PDF document collections.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "ragchat — retrieval-augmented chat over your documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest a document file (.pdf, .txt, .md).
    Ingest {
        /// Path to the file to ingest.
        file: PathBuf,

        /// Owner the document belongs to.
        #[arg(long)]
        owner: String,

        /// Document id; a fresh UUID when omitted. Reusing an id reprocesses
        /// the document, superseding its prior passages.
        #[arg(long)]
        id: Option<String>,

        /// Citation label; defaults to the file name.
        #[arg(long)]
        label: Option<String>,
    },

    /// Ask a question against an owner's corpus.
    Ask {
        /// The question.
        query: String,

        /// Owner whose documents are searched.
        #[arg(long)]
        owner: String,

        /// Chat session id; turns are appended here.
        #[arg(long, default_value = "default")]
        session: String,

        /// Most-recent history turns included in the prompt
        /// (overrides the config value).
        #[arg(long)]
        max_history: Option<usize>,
    },

    /// Show a document's processing status.
    Status {
        document_id: String,

        #[arg(long)]
        owner: String,
    },

    /// List an owner's documents.
    Documents {
        #[arg(long)]
        owner: String,
    },

    /// Delete a document and all of its passages.
    Delete {
        document_id: String,

        #[arg(long)]
        owner: String,
    },

    /// Print a session's transcript.
    History {
        session: String,

        #[arg(long)]
        owner: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Ingest {
            file,
            owner,
            id,
            label,
        } => run_ingest(&config, &file, &owner, id, label).await,
        Commands::Ask {
            query,
            owner,
            session,
            max_history,
        } => run_ask(&config, &query, &owner, &session, max_history).await,
        Commands::Status { document_id, owner } => run_status(&config, &document_id, &owner).await,
        Commands::Documents { owner } => run_documents(&config, &owner).await,
        Commands::Delete { document_id, owner } => run_delete(&config, &document_id, &owner).await,
        Commands::History { session, owner } => run_history(&config, &session, &owner).await,
    }
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("database initialized at {}", config.db.path.display());
    Ok(())
}

async fn build_engine(config: &Config) -> Result<Arc<RagEngine>> {
    let pool = db::connect(&config.db).await?;

    let index = Arc::new(SqliteIndex::new(pool.clone(), config.embedding.dims));
    let documents = Arc::new(SqliteDocumentStore::new(pool.clone()));
    let history = Arc::new(SqliteHistoryStore::new(pool));
    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
    let generator = Arc::new(OllamaGenerator::new(&config.generation)?);

    Ok(Arc::new(RagEngine::new(
        index,
        documents,
        history,
        embedder,
        generator,
        config.chunking.clone(),
        config.retrieval.clone(),
    )))
}

async fn run_ingest(
    config: &Config,
    file: &PathBuf,
    owner: &str,
    id: Option<String>,
    label: Option<String>,
) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let text = extract_text(&bytes, content_type_for(file))?;

    let label = label.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    });
    let document_id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let engine = build_engine(config).await?;
    let status = engine.ingest(&document_id, owner, &label, &text).await?;

    println!("ingest {}", label);
    println!("  document id: {}", document_id);
    println!("  characters extracted: {}", text.chars().count());
    println!("  status: {}", status.as_str());
    if status == DocumentStatus::Failed {
        anyhow::bail!("ingestion failed; see `ragchat status {}`", document_id);
    }
    Ok(())
}

async fn run_ask(
    config: &Config,
    query: &str,
    owner: &str,
    session: &str,
    max_history: Option<usize>,
) -> Result<()> {
    let engine = build_engine(config).await?;
    let max_history = max_history.unwrap_or(config.retrieval.max_history);

    let answer = engine.answer(query, owner, session, max_history).await?;

    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("sources:");
        for source in &answer.sources {
            println!("  - {}", source);
        }
    }
    Ok(())
}

async fn run_status(config: &Config, document_id: &str, owner: &str) -> Result<()> {
    let engine = build_engine(config).await?;
    let doc = engine.get_document(document_id, owner).await?;
    println!("{} {} {}", doc.id, doc.source_label, doc.status.as_str());
    Ok(())
}

async fn run_documents(config: &Config, owner: &str) -> Result<()> {
    let engine = build_engine(config).await?;
    let docs = engine.list_documents(owner).await?;
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in docs {
        println!("{} {} {}", doc.id, doc.source_label, doc.status.as_str());
    }
    Ok(())
}

async fn run_delete(config: &Config, document_id: &str, owner: &str) -> Result<()> {
    let engine = build_engine(config).await?;
    engine.delete_document(document_id, owner).await?;
    println!("deleted {}", document_id);
    Ok(())
}

async fn run_history(config: &Config, session: &str, owner: &str) -> Result<()> {
    let engine = build_engine(config).await?;
    let turns = engine.session_history(session, owner).await?;
    if turns.is_empty() {
        println!("No history.");
        return Ok(());
    }
    for turn in turns {
        println!("{}: {}", turn.role.as_str(), turn.text);
    }
    Ok(())
}
