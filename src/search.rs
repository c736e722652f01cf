//! CLI retrieval inspection.
//!
//! Embeds a query, runs vector search against the store, and prints the
//! ranked chunks with scores. Useful for checking what the answer composer
//! will see for a given question.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::migrate;
use crate::store::{SqliteStore, VectorStore};

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let store: Arc<dyn VectorStore> = Arc::new(SqliteStore::new(pool.clone()));

    let embedder = OpenAiEmbedder::new(&config.embedding)?;
    let query_vec = embedder.embed_query(query).await?;

    let k = limit.unwrap_or(config.retrieval.top_k);
    let results = store.search(&query_vec, k).await?;

    if results.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let source = result
            .metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("(unknown source)");
        let excerpt: String = result.text.chars().take(240).collect();

        println!("{}. [{:.3}] {}", i + 1, result.score, source);
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " "));
        println!();
    }

    pool.close().await;
    Ok(())
}
