//! Pipeline orchestrator for Neighborly.
//!
//! Coordinates a single `answer()` call from query embedding to persisted
//! interaction. Every external dependency may fail; each failure degrades the
//! answer instead of surfacing as an error.

use crate::config::{Prompts, Settings};
use crate::embedding::{embed_checked, Embedder, OpenAIEmbedder};
use crate::error::{NeighborlyError, Result};
use crate::history::{InteractionHistory, InteractionRecord, MemoryHistory};
use crate::index::{top_k, BackfillReport, SimilarityIndex};
use crate::rag::followup::CLARIFICATION_FALLBACK;
use crate::rag::{generate_checked, ContextAssembler, FollowUpSuggester, LanguageModel, OpenAIChatModel};
use crate::store::{Document, DocumentStore, MemoryDocumentStore, SqliteStore};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returned as the answer text when generation fails.
pub const APOLOGY: &str =
    "Sorry, I encountered an error generating a response. Please try again later.";

const SELF_TEST_EMBEDDING_TEXT: &str = "This is a test query for the community AI system.";
const SELF_TEST_RETRIEVAL_QUERY: &str = "community events";
const SELF_TEST_GENERATION_QUERY: &str = "When is the next community meeting?";

/// Pipeline stage of an `answer()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Persisting,
    Done,
    ErrorFallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Assembling => "assembling",
            Stage::Generating => "generating",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
            Stage::ErrorFallback => "error_fallback",
        };
        f.write_str(name)
    }
}

fn transition(stage: Stage) {
    debug!(stage = %stage, "Pipeline stage");
}

/// A dependency failure the answer was degraded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Degradation {
    /// The query could not be embedded; nothing was retrieved.
    EmbeddingFailure,
    /// The corpus could not be read; nothing was retrieved.
    RetrievalFailure,
    /// History could not be read; the prompt has no history.
    HistoryUnavailable,
    /// No answer was generated; the apology was returned.
    GenerationFailure,
    /// The interaction was not recorded.
    PersistenceFailure,
}

/// What `answer()` returns to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub text: String,
    pub suggested_questions: Vec<String>,
    pub retrieved_documents: Vec<Document>,
    /// Degraded paths taken while answering. Never sent to callers.
    #[serde(skip)]
    pub degradations: Vec<Degradation>,
}

impl AssistantResponse {
    /// Whether every dependency behaved.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Result of the integration self-test.
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub embedding: bool,
    pub retrieval: bool,
    pub generation: bool,
    pub overall: bool,
    pub message: String,
}

/// The main orchestrator for the Neighborly pipeline.
pub struct Orchestrator {
    settings: Settings,
    documents: Arc<dyn DocumentStore>,
    history: Arc<dyn InteractionHistory>,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
    index: SimilarityIndex,
    assembler: ContextAssembler,
    suggester: FollowUpSuggester,
}

impl Orchestrator {
    /// Create an orchestrator backed by the configured store and provider.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let (documents, history): (Arc<dyn DocumentStore>, Arc<dyn InteractionHistory>) =
            match settings.store.provider.as_str() {
                "sqlite" => {
                    let store = Arc::new(SqliteStore::new(&settings.sqlite_path())?);
                    info!("Using SQLite store at {}", settings.sqlite_path().display());
                    (store.clone() as Arc<dyn DocumentStore>, store as Arc<dyn InteractionHistory>)
                }
                "memory" => (
                    Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>,
                    Arc::new(MemoryHistory::new()) as Arc<dyn InteractionHistory>,
                ),
                other => {
                    return Err(NeighborlyError::Config(format!(
                        "Unknown store provider: {}",
                        other
                    )))
                }
            };

        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings)?);
        let model = Arc::new(OpenAIChatModel::from_settings(&settings)?);

        info!(
            "Using {} for embeddings and {} for generation",
            settings.embedding.model, settings.generation.model
        );

        Ok(Self::with_components(
            settings, prompts, documents, history, embedder, model,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        documents: Arc<dyn DocumentStore>,
        history: Arc<dyn InteractionHistory>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let index = SimilarityIndex::new(documents.clone())
            .with_timeout(settings.embedding.timeout())
            .with_concurrency(settings.embedding.backfill_concurrency);
        let assembler = ContextAssembler::new(prompts)
            .with_history_limit(settings.history.context_limit)
            .with_preview_chars(settings.history.preview_chars);

        Self {
            settings,
            documents,
            history,
            embedder,
            model,
            index,
            assembler,
            suggester: FollowUpSuggester::new(),
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the document store.
    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        self.documents.clone()
    }

    /// Get a reference to the interaction history.
    pub fn history(&self) -> Arc<dyn InteractionHistory> {
        self.history.clone()
    }

    /// Answer a query for an authenticated user.
    ///
    /// Never fails: dependency failures are logged and recorded in
    /// [`AssistantResponse::degradations`].
    #[instrument(skip(self, query), fields(user = %user_id))]
    pub async fn answer(&self, query: &str, user_id: &str) -> AssistantResponse {
        let mut degradations = Vec::new();
        transition(Stage::Idle);

        let retrieved = self.retrieve_for_query(query, &mut degradations).await;
        info!("Retrieved {} relevant posts", retrieved.len());

        transition(Stage::Assembling);
        let history = match self.recent_history(user_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!("HistoryUnavailable, continuing without history: {}", e);
                degradations.push(Degradation::HistoryUnavailable);
                Vec::new()
            }
        };
        let payload = self.assembler.assemble(query, &retrieved, &history);

        transition(Stage::Generating);
        let (text, suggested_questions) = match generate_checked(
            self.model.as_ref(),
            &payload,
            self.settings.generation.timeout(),
        )
        .await
        {
            Ok(text) => {
                let suggestions = self.suggester.suggest(query, &text);
                (text, suggestions)
            }
            Err(e) => {
                warn!("GenerationFailure, returning apology: {}", e);
                degradations.push(Degradation::GenerationFailure);
                transition(Stage::ErrorFallback);
                (APOLOGY.to_string(), vec![CLARIFICATION_FALLBACK.to_string()])
            }
        };

        transition(Stage::Persisting);
        let record = InteractionRecord::new(
            user_id,
            query,
            text.clone(),
            suggested_questions.clone(),
            retrieved.iter().map(|doc| doc.id.clone()),
        );
        if let Err(e) = self.persist(&record).await {
            warn!("PersistenceFailure, interaction not recorded: {}", e);
            degradations.push(Degradation::PersistenceFailure);
        }

        transition(Stage::Done);
        AssistantResponse {
            text,
            suggested_questions,
            retrieved_documents: retrieved,
            degradations,
        }
    }

    /// Embed the query and retrieve the best posts for it.
    ///
    /// An embedding or store failure is recorded and yields no documents.
    async fn retrieve_for_query(&self, query: &str, degradations: &mut Vec<Degradation>) -> Vec<Document> {
        transition(Stage::Embedding);
        let vector =
            match embed_checked(self.embedder.as_ref(), query, self.settings.embedding.timeout()).await {
                Ok(vector) => vector,
                Err(e) => {
                    warn!("EmbeddingFailure, answering without retrieval: {}", e);
                    degradations.push(Degradation::EmbeddingFailure);
                    transition(Stage::ErrorFallback);
                    return Vec::new();
                }
            };

        transition(Stage::Retrieving);
        match self.retrieve(&vector).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!("RetrievalFailure, answering without documents: {}", e);
                degradations.push(Degradation::RetrievalFailure);
                transition(Stage::ErrorFallback);
                Vec::new()
            }
        }
    }

    /// Backfill the corpus, then rank it against the query vector.
    async fn retrieve(&self, query_vector: &[f32]) -> Result<Vec<Document>> {
        let mut corpus = self.documents.list().await?;

        let report = self
            .index
            .backfill_missing(&corpus, self.embedder.as_ref())
            .await;
        if report.succeeded > 0 {
            corpus = self.documents.list().await?;
        }

        let hits = top_k(query_vector, self.settings.retrieval.top_k, &corpus);
        Ok(hits.into_iter().map(|hit| hit.document).collect())
    }

    async fn recent_history(&self, user_id: &str) -> Result<Vec<InteractionRecord>> {
        let timeout = self.settings.history.timeout();
        tokio::time::timeout(
            timeout,
            self.history.recent(user_id, self.settings.history.context_limit),
        )
        .await
        .map_err(|_| NeighborlyError::HistoryUnavailable(format!("timed out after {:?}", timeout)))?
    }

    async fn persist(&self, record: &InteractionRecord) -> Result<()> {
        let timeout = self.settings.history.timeout();
        tokio::time::timeout(timeout, self.history.append(record))
            .await
            .map_err(|_| NeighborlyError::Persistence(format!("timed out after {:?}", timeout)))?
    }

    /// Embed every document that has no embedding yet.
    pub async fn backfill(&self) -> Result<BackfillReport> {
        self.index.backfill_store(self.embedder.as_ref()).await
    }

    /// Maintenance entry point. Returns `false` only when the candidate
    /// documents could not be listed; per-document failures are retried on
    /// the next run.
    pub async fn generate_embeddings(&self) -> bool {
        match self.backfill().await {
            Ok(report) => {
                info!(
                    "Embedding generation complete: {}/{} succeeded",
                    report.succeeded, report.candidates
                );
                true
            }
            Err(e) => {
                warn!("Error generating embeddings for posts: {}", e);
                false
            }
        }
    }

    /// Add documents to the store. Embeddings are filled in by the next backfill.
    pub async fn import_documents(&self, documents: &[Document]) -> Result<usize> {
        for doc in documents {
            self.documents.insert(doc).await?;
        }
        info!("Imported {} posts", documents.len());
        Ok(documents.len())
    }

    /// The most recent interactions for a user, newest first.
    pub async fn recent_interactions(&self, user_id: &str, n: usize) -> Result<Vec<InteractionRecord>> {
        self.history.recent(user_id, n).await
    }

    /// Exercise embedding, retrieval and generation against the live providers.
    /// Nothing is persisted.
    #[instrument(skip(self))]
    pub async fn self_test(&self) -> SelfTestReport {
        let embed_timeout = self.settings.embedding.timeout();

        let embedding = match embed_checked(self.embedder.as_ref(), SELF_TEST_EMBEDDING_TEXT, embed_timeout).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Embedding test failed: {}", e);
                false
            }
        };
        info!("Embedding test {}", if embedding { "passed" } else { "failed" });

        // An embedding failure still completes retrieval with no hits; only an
        // unreadable store fails it.
        let mut degradations = Vec::new();
        let found = self
            .retrieve_for_query(SELF_TEST_RETRIEVAL_QUERY, &mut degradations)
            .await;
        let retrieval = !degradations.contains(&Degradation::RetrievalFailure);
        info!(
            "Retrieval test {}, found {} posts",
            if retrieval { "passed" } else { "failed" },
            found.len()
        );

        let payload = self.assembler.assemble(SELF_TEST_GENERATION_QUERY, &[], &[]);
        let generation = match generate_checked(self.model.as_ref(), &payload, self.settings.generation.timeout()).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Generation test failed: {}", e);
                false
            }
        };
        info!("Generation test {}", if generation { "passed" } else { "failed" });

        let overall = embedding && retrieval && generation;
        let message = if overall {
            "AI integration test passed successfully!".to_string()
        } else {
            "AI integration test failed. Check logs for details.".to_string()
        };

        SelfTestReport {
            embedding,
            retrieval,
            generation,
            overall,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::followup::GENERAL_FALLBACK;
    use crate::store::Author;
    use crate::testing::{
        FailingEmbedder, FailingHistory, FailingModel, KeywordEmbedder, ScriptedModel, SlowHistory,
        SlowModel,
    };
    use std::time::Duration;

    const SAFETY_QUERY: &str = "What are people discussing about safety?";

    fn watch_launch() -> Document {
        Document::new(
            "Neighborhood Watch Launch",
            "A new safety patrol starts walking the blocks on Monday evenings.",
            "news",
            Author::new("u1", Some("Dana".to_string())),
        )
    }

    fn garden_post() -> Document {
        Document::new(
            "Garden swap",
            "Bring seedlings to the garden on Saturday.",
            "discussion",
            Author::new("u2", None),
        )
    }

    struct Harness {
        orchestrator: Orchestrator,
        history: Arc<MemoryHistory>,
        model: Arc<ScriptedModel>,
    }

    fn harness_with(
        documents: Vec<Document>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryDocumentStore::with_documents(documents)),
            Arc::new(MemoryHistory::new()),
            embedder,
            model,
        )
    }

    fn harness(documents: Vec<Document>, reply: &str) -> Harness {
        let history = Arc::new(MemoryHistory::new());
        let model = Arc::new(ScriptedModel::replying(reply));
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryDocumentStore::with_documents(documents)),
            history.clone(),
            Arc::new(KeywordEmbedder::new()),
            model.clone(),
        );
        Harness {
            orchestrator,
            history,
            model,
        }
    }

    #[tokio::test]
    async fn test_relevant_post_is_retrieved_with_safety_followups() {
        let h = harness(
            vec![garden_post(), watch_launch()],
            "Neighbors are talking about the new patrol.",
        );

        let response = h.orchestrator.answer(SAFETY_QUERY, "alice").await;

        assert!(response
            .retrieved_documents
            .iter()
            .any(|d| d.title == "Neighborhood Watch Launch"));
        assert_eq!(response.retrieved_documents[0].title, "Neighborhood Watch Launch");
        assert!(response
            .suggested_questions
            .contains(&"What safety measures has the community implemented recently?".to_string()));
        assert!(response
            .suggested_questions
            .contains(&"Are there any neighborhood watch programs available?".to_string()));
        assert!(!response.is_degraded());

        // Backfill wrote embeddings back to the store
        let stored = h.orchestrator.documents().list().await.unwrap();
        assert!(stored.iter().all(|d| d.has_embedding()));

        let payload = h.model.last_payload().unwrap();
        assert!(payload.documents[0].contains("Neighborhood Watch Launch"));
    }

    #[tokio::test]
    async fn test_empty_corpus_answers_from_general_knowledge() {
        let h = harness(vec![], "Composting turns scraps into soil.");

        let response = h.orchestrator.answer("How do I start composting?", "alice").await;

        assert!(response.retrieved_documents.is_empty());
        assert!(!response.text.is_empty());
        assert_eq!(response.suggested_questions, GENERAL_FALLBACK.to_vec());
        assert!(h.model.last_payload().unwrap().no_documents_notice.is_some());
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_no_retrieval() {
        let orchestrator = harness_with(
            vec![watch_launch()],
            Arc::new(FailingEmbedder),
            Arc::new(ScriptedModel::replying("General answer.")),
        );

        let response = orchestrator.answer(SAFETY_QUERY, "alice").await;

        assert!(response.retrieved_documents.is_empty());
        assert_eq!(response.text, "General answer.");
        assert_eq!(response.degradations, vec![Degradation::EmbeddingFailure]);
    }

    #[tokio::test]
    async fn test_generation_failure_returns_apology() {
        let orchestrator = harness_with(
            vec![watch_launch()],
            Arc::new(KeywordEmbedder::new()),
            Arc::new(FailingModel),
        );

        let response = orchestrator.answer(SAFETY_QUERY, "alice").await;

        assert_eq!(response.text, APOLOGY);
        assert_eq!(response.suggested_questions, vec![CLARIFICATION_FALLBACK.to_string()]);
        assert_eq!(response.degradations, vec![Degradation::GenerationFailure]);
    }

    #[tokio::test]
    async fn test_generation_timeout_returns_apology() {
        let mut settings = Settings::default();
        settings.generation.timeout_ms = 20;
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryHistory::new()),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(SlowModel::new(Duration::from_secs(5))),
        );

        let response = orchestrator.answer("anything", "alice").await;
        assert_eq!(response.text, APOLOGY);
    }

    #[tokio::test]
    async fn test_answer_is_recorded_in_history() {
        let h = harness(vec![watch_launch()], "There is a new patrol.");

        let response = h.orchestrator.answer(SAFETY_QUERY, "alice").await;

        let recent = h.history.recent("alice", 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, SAFETY_QUERY);
        assert_eq!(recent[0].response, response.text);
        assert_eq!(recent[0].suggested_questions, response.suggested_questions);
        assert_eq!(
            recent[0].referenced_document_ids,
            response
                .retrieved_documents
                .iter()
                .map(|d| d.id.clone())
                .collect::<Vec<_>>()
        );
        assert!(h.history.recent("bob", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_previous_answers_feed_the_next_prompt() {
        let h = harness(vec![], "First answer.");

        h.orchestrator.answer("When is the block party?", "alice").await;
        h.orchestrator.answer("Where is it?", "alice").await;

        let payload = h.model.last_payload().unwrap();
        assert_eq!(payload.history.len(), 1);
        assert!(payload.history[0].contains("When is the block party?"));
    }

    #[tokio::test]
    async fn test_history_outage_does_not_fail_answer() {
        let model = Arc::new(ScriptedModel::replying("Still here."));
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(FailingHistory),
            Arc::new(KeywordEmbedder::new()),
            model.clone(),
        );

        let response = orchestrator.answer("hello", "alice").await;

        assert_eq!(response.text, "Still here.");
        assert!(model.last_payload().unwrap().history.is_empty());
        assert_eq!(
            response.degradations,
            vec![Degradation::HistoryUnavailable, Degradation::PersistenceFailure]
        );
    }

    #[tokio::test]
    async fn test_history_timeouts_degrade_answer() {
        let mut settings = Settings::default();
        settings.history.timeout_ms = 20;
        let model = Arc::new(ScriptedModel::replying("Still here."));
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(SlowHistory::new(Duration::from_secs(5))),
            Arc::new(KeywordEmbedder::new()),
            model.clone(),
        );

        let response = orchestrator.answer("hello", "alice").await;

        assert_eq!(response.text, "Still here.");
        assert!(model.last_payload().unwrap().history.is_empty());
        assert_eq!(
            response.degradations,
            vec![Degradation::HistoryUnavailable, Degradation::PersistenceFailure]
        );
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_pipeline_futures_are_send() {
        let h = harness(vec![watch_launch()], "Yes.");
        let orchestrator = Arc::new(h.orchestrator);

        let answer = orchestrator.answer(SAFETY_QUERY, "alice");
        assert_send(&answer);
        drop(answer);
        let embeddings = orchestrator.generate_embeddings();
        assert_send(&embeddings);
        drop(embeddings);
        let self_test = orchestrator.self_test();
        assert_send(&self_test);
        drop(self_test);

        let spawned = Arc::clone(&orchestrator);
        let response = tokio::spawn(async move { spawned.answer(SAFETY_QUERY, "alice").await })
            .await
            .unwrap();
        assert_eq!(response.text, "Yes.");
    }

    #[tokio::test]
    async fn test_degradations_are_not_serialized() {
        let h = harness(vec![], "ok");
        let response = h.orchestrator.answer("hi", "alice").await;
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("degradations").is_none());
        assert!(json.get("suggestedQuestions").is_some());
        assert!(json.get("retrievedDocuments").is_some());
    }

    #[tokio::test]
    async fn test_generate_embeddings_is_idempotent() {
        let h = harness(vec![watch_launch(), garden_post()], "ok");

        assert!(h.orchestrator.generate_embeddings().await);
        assert!(h.orchestrator.generate_embeddings().await);
        let report = h.orchestrator.backfill().await.unwrap();
        assert_eq!(report, BackfillReport::default());
    }

    #[tokio::test]
    async fn test_self_test_reports_each_stage() {
        let h = harness(vec![], "The next meeting is on Thursday.");
        let report = h.orchestrator.self_test().await;
        assert!(report.embedding && report.retrieval && report.generation && report.overall);
        assert!(h.history.recent("self-test", 10).await.unwrap().is_empty());

        let broken = harness_with(vec![], Arc::new(FailingEmbedder), Arc::new(FailingModel));
        let report = broken.self_test().await;
        assert!(!report.embedding);
        // Retrieval still completes, with no hits, when the embedder is down.
        assert!(report.retrieval);
        assert!(!report.generation);
        assert!(!report.overall);
        assert!(report.message.contains("failed"));
    }

    #[tokio::test]
    async fn test_sqlite_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("community.db")).unwrap());
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            store.clone(),
            store.clone(),
            Arc::new(KeywordEmbedder::new()),
            Arc::new(ScriptedModel::replying("A patrol is starting.")),
        );

        orchestrator
            .import_documents(&[garden_post(), watch_launch()])
            .await
            .unwrap();
        let response = orchestrator.answer(SAFETY_QUERY, "alice").await;

        assert_eq!(response.retrieved_documents[0].title, "Neighborhood Watch Launch");
        assert!(!response.is_degraded());
        let recent = orchestrator.recent_interactions("alice", 1).await.unwrap();
        assert_eq!(recent[0].query, SAFETY_QUERY);
    }
}
