//! Document storage for Neighborly.
//!
//! Community posts live here together with their (optional) embeddings.
//! Creating, editing and deleting posts is the community service's job; this
//! crate only reads the corpus and writes back embeddings.

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author reference, resolvable by the user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// User ID.
    pub id: String,
    /// Display name, if the user service has provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
        }
    }

    /// Name shown in prompts.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Unknown")
    }
}

/// A community post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document ID.
    #[serde(default = "new_document_id")]
    pub id: String,
    /// Post title.
    pub title: String,
    /// Post body.
    pub body: String,
    /// Post category (e.g. "news", "discussion").
    pub category: String,
    /// Who wrote the post.
    pub author: Author,
    /// Embedding vector. Empty until the backfill pass has embedded the post.
    /// Never read from or written to JSON; only the backfill pass sets it.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// When the post was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}

impl Document {
    /// Create a new, not yet embedded document.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        category: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            id: new_document_id(),
            title: title.into(),
            body: body.into(),
            category: category.into(),
            author,
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the document carries an embedding.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    /// Text that gets embedded for this document. Field order is fixed so the
    /// same post always produces the same input.
    pub fn embedding_text(&self) -> String {
        format!(
            "Title: {}\nCategory: {}\nContent: {}",
            self.title, self.category, self.body
        )
    }
}

/// Trait for document store implementations.
///
/// `list` returns documents in corpus order (insertion order), which is the
/// tie-breaker when two documents score the same.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, replacing any document with the same ID in place.
    async fn insert(&self, doc: &Document) -> Result<()>;

    /// Get a single document.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// List the whole corpus in corpus order.
    async fn list(&self) -> Result<Vec<Document>>;

    /// List documents that have no embedding yet, in corpus order.
    async fn list_missing_embeddings(&self) -> Result<Vec<Document>>;

    /// Replace the embedding of an existing document.
    async fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<()>;

    /// Get total document count.
    async fn document_count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_field_order() {
        let doc = Document::new(
            "Neighborhood Watch Launch",
            "Join the safety patrol on Tuesdays.",
            "news",
            Author::new("u1", Some("dana".to_string())),
        );

        assert_eq!(
            doc.embedding_text(),
            "Title: Neighborhood Watch Launch\nCategory: news\nContent: Join the safety patrol on Tuesdays."
        );
        assert!(!doc.has_embedding());
    }

    #[test]
    fn test_author_display_falls_back_to_unknown() {
        assert_eq!(Author::new("u1", None).display(), "Unknown");
        assert_eq!(Author::new("u1", Some("Sam".to_string())).display(), "Sam");
    }

    #[test]
    fn test_serialized_document_omits_embedding() {
        let mut doc = Document::new("t", "b", "discussion", Author::new("u1", None));
        doc.embedding = vec![0.1, 0.2];

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("embedding").is_none());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["author"]["id"], "u1");
    }

    #[test]
    fn test_deserialize_import_defaults() {
        let doc: Document = serde_json::from_str(
            r#"{"title": "Park cleanup", "body": "Saturday 9am", "category": "news",
                "author": {"id": "u7", "displayName": "Rosa"}}"#,
        )
        .unwrap();

        assert!(!doc.id.is_empty());
        assert!(!doc.has_embedding());
        assert_eq!(doc.author.display(), "Rosa");
    }
}
