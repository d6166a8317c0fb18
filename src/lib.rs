//! Neighborly - a community assistant
//!
//! Answers residents' questions from the posts in their community, using
//! retrieval-augmented generation.
//!
//! # Overview
//!
//! For each question Neighborly:
//! - embeds the question and ranks community posts by cosine similarity
//! - fills in embeddings for posts that don't have one yet
//! - builds a prompt from the best posts and the user's recent questions
//! - asks a language model for the answer and suggests follow-up questions
//! - records the interaction for future context
//!
//! Any provider failure degrades the answer instead of failing it.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `embedding` - Embedding generation
//! - `store` - Community posts (memory and SQLite)
//! - `index` - Similarity ranking and embedding backfill
//! - `history` - Per-user interaction history
//! - `rag` - Context assembly, generation and follow-up suggestions
//! - `orchestrator` - The `answer()` pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use neighborly::config::Settings;
//! use neighborly::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let response = orchestrator
//!         .answer("What are people discussing about safety?", "user-42")
//!         .await;
//!     println!("{}", response.text);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{NeighborlyError, Result};
