//! Similarity search over the document corpus.
//!
//! Ranking is a linear scan: every embedded document is scored against the
//! query on each call, so there is no index to invalidate when posts change.

use crate::embedding::{embed_checked, Embedder};
use crate::error::{NeighborlyError, Result};
use crate::store::{Document, DocumentStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default number of documents returned by [`top_k`].
pub const DEFAULT_TOP_K: usize = 5;

/// Compute cosine similarity between two vectors.
///
/// Returns 0 when either vector is empty or all zeros, when the lengths
/// differ, or when the inputs are not finite. Otherwise the result lies in
/// `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !sim.is_finite() {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0) as f32
}

/// A document with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Rank `corpus` against `query` and keep the best `k`.
///
/// Documents without an embedding are skipped. The sort is stable, so equal
/// scores keep their corpus order.
pub fn top_k(query: &[f32], k: usize, corpus: &[Document]) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = corpus
        .iter()
        .filter(|doc| doc.has_embedding())
        .map(|doc| ScoredDocument {
            score: cosine_similarity(query, &doc.embedding),
            document: doc.clone(),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    for hit in &scored {
        debug!("Post \"{}\" has similarity score {:.4}", hit.document.title, hit.score);
    }
    scored
}

/// Outcome of a backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Candidates that needed an embedding.
    pub candidates: usize,
    /// Embeddings computed and stored.
    pub succeeded: usize,
    /// Candidates left un-embedded; they are retried on the next pass.
    pub failed: usize,
}

/// Writes embeddings into the document store and fills in missing ones.
#[derive(Clone)]
pub struct SimilarityIndex {
    store: Arc<dyn DocumentStore>,
    embed_timeout: Duration,
    concurrency: usize,
}

impl SimilarityIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            embed_timeout: Duration::from_secs(30),
            concurrency: 4,
        }
    }

    /// Set the per-document embedding timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Set how many documents are embedded at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Store the vector for a document, replacing any previous one.
    pub async fn upsert(&self, document_id: &str, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(NeighborlyError::InvalidInput(format!(
                "Refusing to store an empty embedding for {}",
                document_id
            )));
        }
        self.store.set_embedding(document_id, vector).await
    }

    /// Embed every candidate that has no embedding yet.
    ///
    /// A failing document is logged and counted; it never stops the others.
    /// Two passes racing on the same document may both embed it; the last
    /// write wins and both write an equivalent vector.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn backfill_missing(
        &self,
        candidates: &[Document],
        embedder: &dyn Embedder,
    ) -> BackfillReport {
        let pending: Vec<&Document> = candidates.iter().filter(|d| !d.has_embedding()).collect();
        let mut report = BackfillReport {
            candidates: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            return report;
        }

        info!("Found {} posts without embeddings", pending.len());

        // Owned jobs keep the stream's futures Send for every borrow lifetime
        let jobs: Vec<(String, String)> = pending
            .iter()
            .map(|doc| (doc.id.clone(), doc.embedding_text()))
            .collect();
        let timeout = self.embed_timeout;

        let mut results = stream::iter(jobs)
            .map(|(id, text)| async move {
                let result = match embed_checked(embedder, &text, timeout).await {
                    Ok(vector) => self.upsert(&id, &vector).await,
                    Err(e) => Err(e),
                };
                (id, result)
            })
            .boxed()
            .buffer_unordered(self.concurrency);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(()) => {
                    debug!("Stored embedding for post {}", id);
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!("Failed to embed post {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Backfill finished: {} embedded, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    /// Load the un-embedded documents from the store and backfill them.
    pub async fn backfill_store(&self, embedder: &dyn Embedder) -> Result<BackfillReport> {
        let candidates = self.store.list_missing_embeddings().await?;
        Ok(self.backfill_missing(&candidates, embedder).await)
    }
}
