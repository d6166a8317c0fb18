//! Configuration module for Neighborly.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, GenerationSettings, HistorySettings, PromptSettings,
    ProviderSettings, RetrievalSettings, Settings, StoreSettings,
};
