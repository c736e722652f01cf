//! Retrieval-augmented answer composer.
//!
//! [`RagEngine`] wires the embedding client, the vector store, and the
//! completion client together: embed the question, retrieve the top-K
//! chunks, assemble a single prompt from the question, the conversation
//! history, and the retrieved knowledge, ask the model once, then run the
//! source attribution filter over the raw answer.
//!
//! The engine holds trait objects at every seam so tests can substitute
//! in-memory doubles for the store and both API clients.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::embedding::Embedder;
use crate::llm::CompletionClient;
use crate::models::{Message, RetrievedChunk};
use crate::store::VectorStore;

/// Phrases that indicate the model lacked information. When the answer
/// contains any of them (case-insensitive), sources are suppressed. This is
/// a heuristic; false positives and negatives are accepted.
const NEGATIVE_PHRASES: &[&str] = &[
    "don't have",
    "no information",
    "don't know",
    "no relevant",
    "i don't have",
    "i don't know",
];

/// Placeholder knowledge block used when retrieval returns nothing.
const NO_KNOWLEDGE: &str = "No relevant documents found in knowledge base";

/// Placeholder history block used when no history is supplied.
const NO_HISTORY: &str = "No previous conversation";

/// A composed answer with the sources that survived attribution filtering.
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub reply: String,
    pub sources: Vec<String>,
}

pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn CompletionClient>,
    top_k: usize,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn CompletionClient>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            top_k,
        }
    }

    /// Retrieve the top-K chunks for a query without generating an answer.
    /// Backs the debug endpoint and the `search` command.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }
        let query_vec = self.embedder.embed_query(query).await?;
        self.store.search(&query_vec, self.top_k).await
    }

    /// Answer a user message from retrieved knowledge.
    ///
    /// Retrieval returning zero chunks does not short-circuit: the model is
    /// still invoked with a placeholder knowledge block.
    pub async fn answer(&self, message: &str, history: Option<&[Message]>) -> Result<RagAnswer> {
        if message.trim().is_empty() {
            bail!("message must not be empty");
        }

        let query_vec = self.embedder.embed_query(message).await?;
        let docs = self.store.search(&query_vec, self.top_k).await?;

        let knowledge = build_knowledge_block(&docs);
        let candidates = collect_sources(&docs);
        let history_block = format_history(history);
        let prompt = build_prompt(message, &history_block, &knowledge);

        let reply = self.llm.complete(&[Message::user(prompt)]).await?;
        let sources = filter_sources(&reply, &candidates);

        Ok(RagAnswer { reply, sources })
    }
}

/// Join retrieved chunk texts into a single double-newline-separated block,
/// or the fixed placeholder when nothing was retrieved.
fn build_knowledge_block(docs: &[RetrievedChunk]) -> String {
    let parts: Vec<&str> = docs
        .iter()
        .map(|d| d.text.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        NO_KNOWLEDGE.to_string()
    } else {
        parts.join("\n\n")
    }
}

/// Best-effort source identifier per chunk: explicit `source` field, then
/// `file_path`, then `filename`, else a positional placeholder. Deduplicated
/// preserving first-seen order.
fn collect_sources(docs: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for (i, doc) in docs.iter().enumerate() {
        let label = ["source", "file_path", "filename"]
            .iter()
            .find_map(|key| doc.metadata.get(*key).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Document #{}", i + 1));

        if !sources.contains(&label) {
            sources.push(label);
        }
    }
    sources
}

/// Render history as alternating `role: content` lines, or the fixed
/// placeholder when absent or empty.
fn format_history(history: Option<&[Message]>) -> String {
    match history {
        Some(messages) if !messages.is_empty() => {
            let mut out = String::new();
            for msg in messages {
                out.push_str(msg.role.as_str());
                out.push_str(": ");
                out.push_str(&msg.content);
                out.push('\n');
            }
            out
        }
        _ => NO_HISTORY.to_string(),
    }
}

fn build_prompt(question: &str, history: &str, knowledge: &str) -> String {
    format!(
        "You are a helpful assistant answering questions from a curated knowledge base.\n\
         \n\
         Your role:\n\
         - Answer questions ONLY using information from the knowledge base content below\n\
         - If the information is not in the knowledge base, clearly state that you don't \
         have that information\n\
         - Be helpful, concise, and direct\n\
         \n\
         Do NOT mention where your information comes from or that you're using a knowledge \
         base. Just answer the question naturally.\n\
         \n\
         The question: {question}\n\
         \n\
         Conversation history:\n{history}\n\
         \n\
         The knowledge base content:\n{knowledge}\n\
         \n\
         Please answer the user's question:"
    )
}

/// Decide which candidate sources to surface for a generated answer.
///
/// If the answer contains any negative-result phrase, the model indicated it
/// lacked information and no sources are shown.
pub fn filter_sources(answer: &str, candidates: &[String]) -> Vec<String> {
    let lowered = answer.to_lowercase();
    if NEGATIVE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Vec::new();
    }
    candidates.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Embedder double returning a fixed vector and counting calls.
    struct StubEmbedder {
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_name(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Completion double returning a canned reply, recording prompts.
    struct StubCompletion {
        reply: String,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl StubCompletion {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(&self, messages: &[Message]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push(messages.last().map(|m| m.content.clone()).unwrap_or_default());
            Ok(self.reply.clone())
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .add(
                &[crate::models::DocumentChunk {
                    id: String::new(),
                    text: "CBT is Cognitive Behavioral Therapy, a structured form of talk therapy."
                        .to_string(),
                    metadata: serde_json::json!({ "source": "intro.pdf" }),
                }],
                &[vec![1.0, 0.0]],
            )
            .await
            .unwrap();
        store
    }

    fn engine(
        store: Arc<MemoryStore>,
        embedder: Arc<StubEmbedder>,
        llm: Arc<StubCompletion>,
    ) -> RagEngine {
        RagEngine::new(store, embedder, llm, 5)
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_any_call() {
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new("unused"));
        let engine = engine(seeded_store().await, embedder.clone(), llm.clone());

        assert!(engine.answer("   ", None).await.is_err());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_answer_includes_matching_source() {
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new(
            "CBT stands for Cognitive Behavioral Therapy.",
        ));
        let engine = engine(seeded_store().await, embedder, llm.clone());

        let answer = engine.answer("What is CBT?", None).await.unwrap();
        assert_eq!(answer.reply, "CBT stands for Cognitive Behavioral Therapy.");
        assert_eq!(answer.sources, vec!["intro.pdf".to_string()]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        // Retrieved knowledge and the question both appear in the prompt.
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Cognitive Behavioral Therapy"));
        assert!(prompts[0].contains("What is CBT?"));
        assert!(prompts[0].contains(NO_HISTORY));
    }

    #[tokio::test]
    async fn test_negative_answer_suppresses_sources() {
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new(
            "I don't have enough information to answer that.",
        ));
        let engine = engine(seeded_store().await, embedder, llm);

        let answer = engine.answer("What is DBT?", None).await.unwrap();
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_still_invokes_model() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new("I don't know."));
        let engine = RagEngine::new(store, embedder, llm.clone(), 5);

        let answer = engine.answer("anything", None).await.unwrap();
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert!(answer.sources.is_empty());

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains(NO_KNOWLEDGE));
    }

    #[tokio::test]
    async fn test_history_rendered_as_role_lines() {
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new("Sure."));
        let engine = engine(seeded_store().await, embedder, llm.clone());

        let history = vec![
            Message::user("I feel anxious lately."),
            Message::assistant("Tell me more about when it started."),
        ];
        engine
            .answer("What coping techniques help?", Some(&history))
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("user: I feel anxious lately."));
        assert!(prompts[0].contains("assistant: Tell me more about when it started."));
    }

    #[tokio::test]
    async fn test_retrieve_rejects_empty_query() {
        let embedder = Arc::new(StubEmbedder::new());
        let llm = Arc::new(StubCompletion::new("unused"));
        let engine = engine(seeded_store().await, embedder.clone(), llm);

        assert!(engine.retrieve("").await.is_err());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_collect_sources_fallbacks_and_dedup() {
        let docs = vec![
            RetrievedChunk {
                text: "a".to_string(),
                metadata: serde_json::json!({ "source": "intro.pdf" }),
                score: 0.9,
            },
            RetrievedChunk {
                text: "b".to_string(),
                metadata: serde_json::json!({ "file_path": "guide.pdf" }),
                score: 0.8,
            },
            RetrievedChunk {
                text: "c".to_string(),
                metadata: serde_json::json!({ "source": "intro.pdf" }),
                score: 0.7,
            },
            RetrievedChunk {
                text: "d".to_string(),
                metadata: serde_json::json!({}),
                score: 0.6,
            },
        ];
        let sources = collect_sources(&docs);
        assert_eq!(sources, vec!["intro.pdf", "guide.pdf", "Document #4"]);
    }

    #[test]
    fn test_filter_sources_negative_phrases() {
        let candidates = vec!["intro.pdf".to_string()];
        assert!(filter_sources(
            "I don't have enough information about that.",
            &candidates
        )
        .is_empty());
        assert!(filter_sources("There is NO RELEVANT content here.", &candidates).is_empty());
        assert_eq!(
            filter_sources("CBT helps restructure thoughts.", &candidates),
            candidates
        );
    }

    #[test]
    fn test_filter_sources_empty_candidates() {
        assert!(filter_sources("A confident answer.", &[]).is_empty());
    }
}
