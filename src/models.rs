//! Core data models used throughout mindbase.
//!
//! These types represent the conversation messages, document chunks, and
//! retrieval results that flow through the ingestion and answer pipeline.

use serde::{Deserialize, Serialize};

/// Speaker role within a conversation transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Lowercase label used when rendering history into a prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation transcript.
///
/// An ordered sequence of messages forms the transcript; the first entry is
/// always the system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An embedded slice of a source document, the unit of retrieval.
///
/// Immutable once stored; removed only by an explicit clear operation.
/// Metadata is free-form JSON (typically `{"source": "<relative path>"}`).
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Unique id. The store assigns a fresh UUID when this is empty.
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// A chunk returned from vector search, ranked by descending similarity.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: serde_json::Value,
    /// Cosine similarity against the query vector.
    pub score: f32,
}
