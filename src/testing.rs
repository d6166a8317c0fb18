//! Deterministic stand-ins for the external services, for unit tests.

use crate::embedding::Embedder;
use crate::error::{NeighborlyError, Result};
use crate::history::{InteractionHistory, InteractionRecord};
use crate::rag::{ContextPayload, LanguageModel};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const VOCABULARY: &[&str] = &[
    "safety", "patrol", "event", "festival", "garden", "road", "council", "park", "library",
    "compost", "meeting", "community",
];

/// Bag-of-words embedder over a small fixed vocabulary.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vectorize(text))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Always returns the same vector.
pub struct FixedEmbedder {
    vector: Vec<f32>,
    dimensions: usize,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>, dimensions: usize) -> Self {
        Self { vector, dimensions }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Always fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(NeighborlyError::Embedding("upstream unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Fails for texts containing a marker, otherwise behaves like [`KeywordEmbedder`].
pub struct FlakyEmbedder {
    marker: &'static str,
}

impl FlakyEmbedder {
    pub fn failing_on(marker: &'static str) -> Self {
        Self { marker }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(self.marker) {
            return Err(NeighborlyError::Embedding("rejected".to_string()));
        }
        Ok(KeywordEmbedder::vectorize(text))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Sleeps before answering.
pub struct SlowEmbedder {
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(KeywordEmbedder::vectorize(text))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Counts calls to the wrapped embedder.
pub struct CountingEmbedder<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E> CountingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CountingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Replies with fixed text and remembers the last payload it saw.
pub struct ScriptedModel {
    reply: String,
    last_payload: Mutex<Option<ContextPayload>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last_payload: Mutex::new(None),
        }
    }

    pub fn last_payload(&self) -> Option<ContextPayload> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, payload: &ContextPayload) -> Result<String> {
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        Ok(self.reply.clone())
    }
}

/// Always fails.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(&self, _payload: &ContextPayload) -> Result<String> {
        Err(NeighborlyError::Generation("quota exceeded".to_string()))
    }
}

/// Sleeps before answering.
pub struct SlowModel {
    delay: Duration,
}

impl SlowModel {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl LanguageModel for SlowModel {
    async fn generate(&self, _payload: &ContextPayload) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }
}

/// History whose backing store is down.
pub struct FailingHistory;

#[async_trait]
impl InteractionHistory for FailingHistory {
    async fn recent(&self, _user_id: &str, _n: usize) -> Result<Vec<InteractionRecord>> {
        Err(NeighborlyError::HistoryUnavailable("connection refused".to_string()))
    }

    async fn append(&self, _record: &InteractionRecord) -> Result<()> {
        Err(NeighborlyError::Persistence("connection refused".to_string()))
    }
}

/// History that answers only after `delay`.
pub struct SlowHistory {
    delay: Duration,
}

impl SlowHistory {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl InteractionHistory for SlowHistory {
    async fn recent(&self, _user_id: &str, _n: usize) -> Result<Vec<InteractionRecord>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn append(&self, _record: &InteractionRecord) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
