//! # mindbase CLI
//!
//! The `mindbase` binary is the single entry point for the service: database
//! initialization, document ingestion, retrieval inspection, the interactive
//! console session, and the HTTP chat server.
//!
//! ## Usage
//!
//! ```bash
//! mindbase --config ./config/mindbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mindbase init` | Create the SQLite store and run schema migrations |
//! | `mindbase ingest` | Load, chunk, embed, and store the data directory |
//! | `mindbase stats` | Show vector store statistics |
//! | `mindbase clear` | Remove every stored chunk |
//! | `mindbase search "<query>"` | Inspect retrieval for a query |
//! | `mindbase chat` | Interactive console chat session |
//! | `mindbase serve` | Start the HTTP chat service |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mindbase::{config, db, ingest, migrate, repl, search, server};

/// mindbase — a retrieval-augmented chat assistant backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/mindbase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "mindbase",
    about = "mindbase — a retrieval-augmented chat assistant backend",
    version,
    long_about = "mindbase ingests a directory of source documents, embeds them into a local \
    vector store, and answers chat messages from the retrieved content via a hosted completion \
    model, exposed over a CLI and an HTTP service."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mindbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector store schema.
    ///
    /// Creates the SQLite database file and the documents table. Idempotent.
    Init,

    /// Ingest the configured data directory.
    ///
    /// Loads PDF/Markdown/text files, splits them into overlapping chunks,
    /// embeds each chunk, and writes everything into the store. Re-running
    /// without `--clear` duplicates previously ingested content.
    Ingest {
        /// Remove all existing chunks before ingesting.
        #[arg(long)]
        clear: bool,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of source documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show vector store statistics.
    Stats,

    /// Remove every stored chunk.
    Clear,

    /// Inspect retrieval for a query.
    ///
    /// Embeds the query, runs vector search, and prints the ranked chunks
    /// with similarity scores.
    Search {
        /// The query string.
        query: String,

        /// Maximum number of results (defaults to retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start an interactive console chat session.
    ///
    /// Maintains a conversation transcript with a token budget; the oldest
    /// turns are dropped once the budget is exceeded.
    Chat,

    /// Start the HTTP chat service.
    ///
    /// Binds to `[server].bind` and serves /chat, /chat/stream, /health,
    /// and /debug/retrieve.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Vector store initialized successfully.");
        }
        Commands::Ingest {
            clear,
            dry_run,
            limit,
        } => {
            ingest::run_ingest(&cfg, clear, dry_run, limit).await?;
        }
        Commands::Stats => {
            ingest::run_stats(&cfg).await?;
        }
        Commands::Clear => {
            ingest::run_clear(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Chat => {
            repl::run_chat(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
