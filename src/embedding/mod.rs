//! Embedding generation for semantic retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::{NeighborlyError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for embedding generation.
///
/// Implementations fail with [`NeighborlyError::Embedding`] when the upstream
/// service errors or returns an empty vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Embed `text`, treating a timeout or a vector of the wrong length as a failure.
pub async fn embed_checked(embedder: &dyn Embedder, text: &str, timeout: Duration) -> Result<Vec<f32>> {
    let vector = tokio::time::timeout(timeout, embedder.embed(text))
        .await
        .map_err(|_| NeighborlyError::Embedding(format!("timed out after {:?}", timeout)))??;

    if vector.is_empty() {
        return Err(NeighborlyError::Embedding("empty embedding vector".to_string()));
    }
    if vector.len() != embedder.dimensions() {
        return Err(NeighborlyError::Embedding(format!(
            "expected {} dimensions, got {}",
            embedder.dimensions(),
            vector.len()
        )));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, FixedEmbedder, KeywordEmbedder, SlowEmbedder};

    #[tokio::test]
    async fn test_embed_checked_accepts_well_formed_vector() {
        let embedder = KeywordEmbedder::new();
        let vector = embed_checked(&embedder, "safety patrol", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(vector.len(), embedder.dimensions());
    }

    #[tokio::test]
    async fn test_embed_checked_rejects_empty_and_mismatched() {
        let embedder = FixedEmbedder::new(vec![], 4);
        let err = embed_checked(&embedder, "text", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NeighborlyError::Embedding(_)));

        let embedder = FixedEmbedder::new(vec![1.0, 2.0, 3.0], 4);
        let err = embed_checked(&embedder, "text", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NeighborlyError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_checked_times_out_as_embedding_failure() {
        let embedder = SlowEmbedder::new(Duration::from_secs(5));
        let err = embed_checked(&embedder, "text", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, NeighborlyError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_checked_propagates_provider_failure() {
        let err = embed_checked(&FailingEmbedder, "text", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, NeighborlyError::Embedding(_)));
    }
}
