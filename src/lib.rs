//! # ragchat
//!
//! A retrieval-augmented chat engine for PDF document collections.
//!
//! ragchat ingests documents (PDF or plain text), splits them into
//! overlapping passages, embeds each passage, and indexes the vectors for
//! owner-scoped nearest-neighbor search. Questions are answered by combining
//! retrieved passages with the session's conversation history into a bounded
//! prompt for a language model, with source citations deduplicated in rank
//! order.
//!
//! ## Architecture
//!
//! ```text
//! ingest:  raw bytes ─▶ extract ─▶ chunk ─▶ embed ─▶ vector index
//! answer:  query ─▶ embed ─▶ search ─▶ prompt (+history) ─▶ generate
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`chunk`] | Fixed-window overlapping text chunker |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | Embedding provider abstraction + Ollama client |
//! | [`generation`] | Generation provider abstraction + Ollama client |
//! | [`index`] | Vector index (SQLite and in-memory) |
//! | [`store`] | Document status and chat history stores |
//! | [`prompt`] | Deterministic prompt assembly |
//! | [`rag`] | Ingestion and answering orchestrator |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod store;
