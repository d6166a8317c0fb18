//! In-memory document store implementation.
//!
//! Useful for testing and small datasets.

use super::{Document, DocumentStore};
use crate::error::{NeighborlyError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory document store. Keeps documents in insertion order.
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryDocumentStore {
    /// Create a new in-memory document store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Create a store pre-populated with documents.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> NeighborlyError {
    NeighborlyError::DocumentStore(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, doc: &Document) -> Result<()> {
        let mut docs = self.documents.write().map_err(poisoned)?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.clone())
    }

    async fn list_missing_embeddings(&self) -> Result<Vec<Document>> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.iter().filter(|d| !d.has_embedding()).cloned().collect())
    }

    async fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        let mut docs = self.documents.write().map_err(poisoned)?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| NeighborlyError::DocumentStore(format!("Document not found: {}", id)))?;
        doc.embedding = embedding.to_vec();
        Ok(())
    }

    async fn document_count(&self) -> Result<usize> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.len())
    }
}
