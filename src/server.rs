//! HTTP chat service.
//!
//! Exposes the answer composer over a small JSON API:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a message with retrieval-augmented generation |
//! | `POST` | `/chat/stream` | Same contract, delivered as server-sent events |
//! | `GET`  | `/health` | Health check |
//! | `GET`  | `/debug/retrieve?query=...` | Inspect raw retrieval results |
//!
//! The crisis keyword scan runs before any retrieval or model work and
//! short-circuits to a fixed safety message. Empty messages are rejected
//! with a client error before the model is ever invoked. Every other
//! internal failure is converted at this boundary into a JSON error body:
//!
//! ```json
//! { "error": { "code": "upstream_error", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502), `internal` (500).
//!
//! Requests are stateless: conversation history, if any, travels in the
//! request payload. CORS is fully permissive to support browser clients.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::embedding::OpenAiEmbedder;
use crate::llm::OpenAiCompletion;
use crate::migrate;
use crate::models::Message;
use crate::rag::RagEngine;
use crate::safety;
use crate::store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    rag: Arc<RagEngine>,
}

/// Start the HTTP server with OpenAI-backed clients and the SQLite store.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool));
    let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
    let llm = Arc::new(OpenAiCompletion::new(&config.llm)?);
    let rag = Arc::new(RagEngine::new(
        store,
        embedder,
        llm,
        config.retrieval.top_k,
    ));

    run_server_with_engine(config, rag).await
}

/// Start the server with a caller-supplied answer engine.
pub async fn run_server_with_engine(config: &Config, rag: Arc<RagEngine>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        rag,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/chat/stream", post(handle_chat_stream))
        .route("/health", get(handle_health))
        .route("/debug/retrieve", get(handle_debug_retrieve))
        .layer(cors)
        .with_state(state);

    println!("chat server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map pipeline errors to HTTP statuses at the endpoint boundary. Raw error
/// chains are logged server-side; the client sees only the classified body.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    eprintln!("request failed: {}", msg);

    if msg.contains("must not be empty") || msg.contains("cannot embed empty") {
        bad_request(msg)
    } else if msg.contains("API error") || msg.contains("OPENAI_API_KEY") {
        upstream_error("upstream provider request failed".to_string())
    } else {
        internal_error("internal error while processing the message".to_string())
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    conversation_history: Option<Vec<Message>>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<String>>,
    crisis: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

/// Shared request flow for `/chat` and `/chat/stream`.
async fn compose_chat_response(
    state: &AppState,
    request: ChatRequest,
) -> Result<ChatResponse, AppError> {
    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    // Crisis scan takes precedence over all retrieval and model logic.
    if safety::is_crisis(&request.message, &state.config.safety.crisis_phrases) {
        return Ok(ChatResponse {
            reply: state.config.safety.safety_message.clone(),
            sources: None,
            crisis: true,
            session_id: request.session_id,
        });
    }

    let answer = state
        .rag
        .answer(&request.message, request.conversation_history.as_deref())
        .await
        .map_err(classify_error)?;

    Ok(ChatResponse {
        reply: answer.reply,
        sources: Some(answer.sources),
        crisis: false,
        session_id: request.session_id,
    })
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = compose_chat_response(&state, request).await?;
    Ok(Json(response))
}

// ============ POST /chat/stream ============

/// Server-sent events variant of `/chat`.
///
/// The upstream completion is still a single call; the response is flushed
/// as one `message` event carrying the full payload, followed by a `done`
/// event.
async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let response = compose_chat_response(&state, request).await?;
    let payload = serde_json::to_string(&response)
        .map_err(|e| internal_error(format!("response serialization failed: {}", e)))?;

    let events = stream::iter(vec![
        Ok(Event::default().event("message").data(payload)),
        Ok(Event::default().event("done").data("[DONE]")),
    ]);

    Ok(Sse::new(events))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    message: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("mindbase {} is running", env!("CARGO_PKG_VERSION")),
    })
}

// ============ GET /debug/retrieve ============

#[derive(Deserialize)]
struct RetrieveParams {
    query: String,
}

#[derive(Serialize)]
struct RetrieveResponse {
    query: String,
    num_results: usize,
    documents: Vec<RetrievedDocument>,
}

#[derive(Serialize)]
struct RetrievedDocument {
    rank: usize,
    content: String,
    metadata: serde_json::Value,
}

/// Inspect what retrieval returns for a query, without invoking the model.
async fn handle_debug_retrieve(
    State(state): State<AppState>,
    Query(params): Query<RetrieveParams>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let docs = state
        .rag
        .retrieve(&params.query)
        .await
        .map_err(classify_error)?;

    let documents: Vec<RetrievedDocument> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| RetrievedDocument {
            rank: i + 1,
            content: doc.text.chars().take(300).collect(),
            metadata: doc.metadata.clone(),
        })
        .collect();

    Ok(Json(RetrieveResponse {
        query: params.query,
        num_results: documents.len(),
        documents,
    }))
}
