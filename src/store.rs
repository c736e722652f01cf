//! Vector store adapter.
//!
//! The [`VectorStore`] trait defines the storage operations the ingestion
//! pipeline and answer composer need, enabling pluggable backends:
//! [`SqliteStore`] for persistent deployments and [`MemoryStore`] for tests.
//!
//! Search is brute-force cosine similarity over all stored vectors, ranked
//! descending and truncated to `k`. Ties keep the backend's native order.
//! `add` assigns a fresh UUID to any chunk without an id; repeated ingestion
//! of identical content therefore creates duplicate entries unless the
//! caller supplies the same ids or clears the store first.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{DocumentChunk, RetrievedChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store chunks with their embedding vectors (parallel slices).
    /// Returns the assigned ids in input order.
    async fn add(&self, chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<Vec<String>>;

    /// Return at most `k` chunks ordered by descending cosine similarity
    /// to `query_vec`.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Remove entries by id. Unknown ids are ignored.
    async fn clear(&self, ids: &[String]) -> Result<u64>;

    /// Remove every entry.
    async fn clear_all(&self) -> Result<u64>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<u64>;
}

fn ensure_parallel(chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != vectors.len() {
        anyhow::bail!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }
    Ok(())
}

fn assigned_id(chunk: &DocumentChunk) -> String {
    if chunk.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        chunk.id.clone()
    }
}

// ============ SQLite backend ============

/// Persistent store over the `documents` table (id, content, metadata_json,
/// embedding BLOB, created_at).
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&self, chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<Vec<String>> {
        ensure_parallel(chunks, vectors)?;

        let now = chrono::Utc::now().timestamp();
        let mut ids = Vec::with_capacity(chunks.len());
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let id = assigned_id(chunk);
            sqlx::query(
                "INSERT INTO documents (id, content, metadata_json, embedding, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&chunk.text)
            .bind(chunk.metadata.to_string())
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query("SELECT content, metadata_json, embedding FROM documents")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                let metadata =
                    serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({}));
                RetrievedChunk {
                    text: row.get("content"),
                    metadata,
                    score: cosine_similarity(query_vec, &blob_to_vec(&blob)),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn clear(&self, ids: &[String]) -> Result<u64> {
        let mut removed = 0u64;
        let mut tx = self.pool.begin().await?;
        for id in ids {
            let result = sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ============ In-memory backend ============

struct StoredEntry {
    id: String,
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// In-memory store for tests. Insertion order is the native tie-break order.
pub struct MemoryStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add(&self, chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<Vec<String>> {
        ensure_parallel(chunks, vectors)?;

        let mut entries = self.entries.write().unwrap();
        let mut ids = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let id = assigned_id(chunk);
            entries.push(StoredEntry {
                id: id.clone(),
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let entries = self.entries.read().unwrap();
        let mut scored: Vec<RetrievedChunk> = entries
            .iter()
            .map(|e| RetrievedChunk {
                text: e.chunk.text.clone(),
                metadata: e.chunk.metadata.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn clear(&self, ids: &[String]) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        Ok((before - entries.len()) as u64)
    }

    async fn clear_all(&self) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.read().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: serde_json::json!({ "source": "test.txt" }),
        }
    }

    #[tokio::test]
    async fn test_add_assigns_ids_when_missing() {
        let store = MemoryStore::new();
        let ids = store
            .add(
                &[chunk("", "a"), chunk("fixed-id", "b")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!ids[0].is_empty());
        assert_eq!(ids[1], "fixed-id");
    }

    #[tokio::test]
    async fn test_add_is_not_idempotent() {
        let store = MemoryStore::new();
        let chunks = [chunk("", "same text")];
        let vectors = [vec![1.0, 0.0]];
        store.add(&chunks, &vectors).await.unwrap();
        store.add(&chunks, &vectors).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_top_k_descending() {
        let store = MemoryStore::new();
        store
            .add(
                &[
                    chunk("a", "far"),
                    chunk("b", "near"),
                    chunk("c", "mid"),
                    chunk("d", "exact"),
                ],
                &[
                    vec![-1.0, 0.0],
                    vec![0.9, 0.1],
                    vec![0.5, 0.5],
                    vec![1.0, 0.0],
                ],
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "exact");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_clear_by_id_and_all() {
        let store = MemoryStore::new();
        let ids = store
            .add(
                &[chunk("", "a"), chunk("", "b"), chunk("", "c")],
                &[vec![1.0], vec![1.0], vec![1.0]],
            )
            .await
            .unwrap();

        let removed = store.clear(&ids[..1]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 2);

        // Unknown ids are ignored
        assert_eq!(store.clear(&["nope".to_string()]).await.unwrap(), 0);

        assert_eq!(store.clear_all().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_vectors_rejected() {
        let store = MemoryStore::new();
        let result = store.add(&[chunk("", "a")], &[]).await;
        assert!(result.is_err());
    }
}
