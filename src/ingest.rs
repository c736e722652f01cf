//! Document ingestion pipeline orchestration.
//!
//! Coordinates the full run: load documents from the data directory, split
//! them into overlapping chunks, embed each batch, and write everything into
//! the vector store. Any stage error aborts the rest of the run; there is no
//! checkpointing, so a re-run duplicates chunks unless the store is cleared
//! first (`--clear` or the `clear` command).

use anyhow::Result;

use crate::chunk::split_text;
use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::extract;
use crate::migrate;
use crate::models::DocumentChunk;
use crate::store::{SqliteStore, VectorStore};

pub async fn run_ingest(
    config: &Config,
    clear_first: bool,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut documents = extract::scan_data_dir(&config.ingest)?;
    if let Some(lim) = limit {
        documents.truncate(lim);
    }

    let mut chunks: Vec<DocumentChunk> = Vec::new();
    for doc in &documents {
        for text in split_text(&doc.text, config.ingest.chunk_size, config.ingest.overlap) {
            chunks.push(DocumentChunk {
                id: String::new(),
                text,
                metadata: serde_json::json!({ "source": doc.source }),
            });
        }
    }

    if dry_run {
        println!("ingest (dry-run)");
        println!("  documents found: {}", documents.len());
        println!("  estimated chunks: {}", chunks.len());
        return Ok(());
    }

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    if clear_first {
        let removed = store.clear_all().await?;
        println!("cleared {} existing chunks", removed);
    }

    let embedder = OpenAiEmbedder::new(&config.embedding)?;

    let mut stored = 0u64;
    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_texts(&texts).await?;
        let ids = store.add(batch, &vectors).await?;
        stored += ids.len() as u64;
    }

    println!("ingest");
    println!("  documents loaded: {}", documents.len());
    println!("  chunks written: {}", stored);
    println!("  embedding model: {}", embedder.model_name());
    println!("  store: {}", config.db.path.display());
    println!("ok");

    pool.close().await;
    Ok(())
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    println!("vector store statistics");
    println!("  path: {}", config.db.path.display());
    println!("  chunks: {}", store.count().await?);
    println!("  embedding model: {}", config.embedding.model);
    println!("  dims: {}", config.embedding.dims);

    pool.close().await;
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    let removed = store.clear_all().await?;
    println!("removed {} chunks", removed);

    pool.close().await;
    Ok(())
}
