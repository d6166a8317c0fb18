//! Error types for Neighborly.

use thiserror::Error;

/// Library-level error type for Neighborly operations.
#[derive(Error, Debug)]
pub enum NeighborlyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Response generation failed: {0}")]
    Generation(String),

    #[error("Interaction history unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("Failed to persist interaction: {0}")]
    Persistence(String),

    #[error("Document store error: {0}")]
    DocumentStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Neighborly operations.
pub type Result<T> = std::result::Result<T, NeighborlyError>;
