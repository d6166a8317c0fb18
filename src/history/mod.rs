//! Per-user interaction history.
//!
//! Every completed answer is appended once and never modified. Recent entries
//! feed back into the prompt so follow-up questions have context.

mod memory;

pub use memory::MemoryHistory;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of entries returned by [`InteractionHistory::recent`] callers.
pub const DEFAULT_RECENT: usize = 3;

/// One answered query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    /// Record ID.
    pub id: String,
    /// Who asked.
    pub user_id: String,
    /// The query as asked.
    pub query: String,
    /// The answer text returned.
    pub response: String,
    /// Follow-up suggestions returned (at most 3).
    pub suggested_questions: Vec<String>,
    /// Documents the answer was grounded on, without duplicates.
    pub referenced_document_ids: Vec<String>,
    /// When the answer was produced.
    pub created_at: DateTime<Utc>,
}

impl InteractionRecord {
    /// Create a new record stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        response: impl Into<String>,
        suggested_questions: Vec<String>,
        referenced_document_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut ids: Vec<String> = Vec::new();
        for id in referenced_document_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            query: query.into(),
            response: response.into(),
            suggested_questions,
            referenced_document_ids: ids,
            created_at: Utc::now(),
        }
    }
}

/// Append-only store of interaction records.
#[async_trait]
pub trait InteractionHistory: Send + Sync {
    /// The `n` most recent records for a user, newest first.
    ///
    /// Fails with `HistoryUnavailable` when the backing store cannot be read.
    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<InteractionRecord>>;

    /// Durably append a record.
    ///
    /// Fails with `Persistence` when the record could not be written.
    async fn append(&self, record: &InteractionRecord) -> Result<()>;
}
