//! # mindbase
//!
//! A retrieval-augmented chat assistant backend for CBT support content.
//!
//! mindbase ingests a directory of source documents (PDF, Markdown, plain
//! text), splits them into overlapping chunks, embeds each chunk via a
//! hosted embedding model, and stores the vectors in SQLite. At chat time a
//! user message is embedded, the nearest chunks are retrieved, and a
//! completion model answers from the retrieved knowledge alone. A crisis
//! keyword filter runs ahead of everything and short-circuits to a fixed
//! safety message.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │ data dir │──▶│ chunk + embed  │──▶│  SQLite  │
//! │ pdf/md/txt│   │   (ingest)    │   │  vectors │
//! └──────────┘   └───────────────┘   └────┬─────┘
//!                                         │
//!                        ┌────────────────┤
//!                        ▼                ▼
//!                  ┌──────────┐     ┌──────────┐
//!                  │   CLI    │     │   HTTP   │
//!                  │  (chat)  │     │  (axum)  │
//!                  └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mindbase init                 # create the vector store
//! mindbase ingest               # chunk + embed the data directory
//! mindbase search "what is CBT" # inspect retrieval
//! mindbase serve                # start the HTTP chat service
//! mindbase chat                 # interactive console session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping text splitter |
//! | [`extract`] | Data directory scanning and text extraction |
//! | [`embedding`] | Embedding client and vector helpers |
//! | [`llm`] | Completion client |
//! | [`store`] | Vector store adapter (SQLite, in-memory) |
//! | [`ingest`] | Ingestion pipeline |
//! | [`rag`] | Answer composer and source attribution filter |
//! | [`safety`] | Crisis keyword filter |
//! | [`budget`] | Transcript token budget |
//! | [`server`] | HTTP chat service |

pub mod budget;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod rag;
pub mod repl;
pub mod safety;
pub mod search;
pub mod server;
pub mod store;
