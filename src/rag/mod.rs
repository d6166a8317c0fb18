//! RAG (Retrieval-Augmented Generation) building blocks.
//!
//! Context assembly, answer generation and follow-up suggestions. The
//! orchestrator wires them together with retrieval and history.

pub mod context;
pub mod followup;
mod generation;

pub use context::{ContextAssembler, ContextPayload};
pub use followup::FollowUpSuggester;
pub use generation::{generate_checked, LanguageModel, OpenAIChatModel};
