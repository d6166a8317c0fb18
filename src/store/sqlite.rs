//! SQLite-based store implementation.
//!
//! Holds both the document corpus and the interaction history in one database.
//! Similarity is computed in Rust over the full corpus; embeddings are stored
//! as little-endian `f32` blobs, with an empty blob meaning "not embedded".

use super::{Author, Document, DocumentStore};
use crate::error::{NeighborlyError, Result};
use crate::history::{InteractionHistory, InteractionRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        category TEXT NOT NULL,
        author_id TEXT NOT NULL,
        author_name TEXT,
        embedding BLOB NOT NULL DEFAULT x'',
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS interactions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        query TEXT NOT NULL,
        response TEXT NOT NULL,
        suggested_questions TEXT NOT NULL,
        referenced_document_ids TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_interactions_user ON interactions(user_id, created_at);
"#;

const DOCUMENT_COLUMNS: &str =
    "id, title, body, category, author_id, author_name, embedding, created_at";

/// SQLite-based document store and interaction history.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| NeighborlyError::DocumentStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let created_at: String = row.get(7)?;

        Ok(Document {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            category: row.get(3)?,
            author: Author {
                id: row.get(4)?,
                display_name: row.get(5)?,
            },
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            created_at: parse_timestamp(&created_at),
        })
    }

    fn query_documents(&self, sql: &str) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let docs = stmt.query_map([], Self::row_to_document)?;
        let result: Vec<Document> = docs.collect::<rusqlite::Result<_>>()?;
        Ok(result)
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    #[instrument(skip(self, doc), fields(id = %doc.id))]
    async fn insert(&self, doc: &Document) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO documents
            (id, title, body, category, author_id, author_name, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                category = excluded.category,
                author_id = excluded.author_id,
                author_name = excluded.author_name,
                embedding = excluded.embedding,
                created_at = excluded.created_at
            "#,
            params![
                doc.id,
                doc.title,
                doc.body,
                doc.category,
                doc.author.id,
                doc.author.display_name,
                Self::embedding_to_bytes(&doc.embedding),
                format_timestamp(&doc.created_at),
            ],
        )?;

        debug!("Inserted document {}", doc.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![id],
                Self::row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Document>> {
        let docs = self.query_documents(&format!(
            "SELECT {} FROM documents ORDER BY seq",
            DOCUMENT_COLUMNS
        ))?;
        debug!("Loaded {} documents", docs.len());
        Ok(docs)
    }

    #[instrument(skip(self))]
    async fn list_missing_embeddings(&self) -> Result<Vec<Document>> {
        self.query_documents(&format!(
            "SELECT {} FROM documents WHERE length(embedding) = 0 ORDER BY seq",
            DOCUMENT_COLUMNS
        ))
    }

    #[instrument(skip(self, embedding), fields(dimensions = embedding.len()))]
    async fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE documents SET embedding = ?1 WHERE id = ?2",
            params![Self::embedding_to_bytes(embedding), id],
        )?;

        if updated == 0 {
            return Err(NeighborlyError::DocumentStore(format!("Document not found: {}", id)));
        }
        Ok(())
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// Interaction history (same database, separate table)
#[async_trait]
impl InteractionHistory for SqliteStore {
    #[instrument(skip(self))]
    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<InteractionRecord>> {
        let unavailable = |e: rusqlite::Error| NeighborlyError::HistoryUnavailable(e.to_string());

        let conn = self
            .conn
            .lock()
            .map_err(|e| NeighborlyError::HistoryUnavailable(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, user_id, query, response, suggested_questions,
                       referenced_document_ids, created_at
                FROM interactions
                WHERE user_id = ?1
                ORDER BY created_at DESC, seq DESC
                LIMIT ?2
                "#,
            )
            .map_err(unavailable)?;

        let rows = stmt
            .query_map(params![user_id, n as i64], |row| {
                let suggested: String = row.get(4)?;
                let referenced: String = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok((
                    InteractionRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        query: row.get(2)?,
                        response: row.get(3)?,
                        suggested_questions: Vec::new(),
                        referenced_document_ids: Vec::new(),
                        created_at: parse_timestamp(&created_at),
                    },
                    suggested,
                    referenced,
                ))
            })
            .map_err(unavailable)?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, suggested, referenced) = row.map_err(unavailable)?;
            record.suggested_questions = serde_json::from_str(&suggested)
                .map_err(|e| NeighborlyError::HistoryUnavailable(e.to_string()))?;
            record.referenced_document_ids = serde_json::from_str(&referenced)
                .map_err(|e| NeighborlyError::HistoryUnavailable(e.to_string()))?;
            records.push(record);
        }

        debug!("Found {} interactions for user {}", records.len(), user_id);
        Ok(records)
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| NeighborlyError::Persistence(format!("Failed to acquire lock: {}", e)))?;

        let suggested = serde_json::to_string(&record.suggested_questions)
            .map_err(|e| NeighborlyError::Persistence(e.to_string()))?;
        let referenced = serde_json::to_string(&record.referenced_document_ids)
            .map_err(|e| NeighborlyError::Persistence(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO interactions
            (id, user_id, query, response, suggested_questions, referenced_document_ids, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.user_id,
                record.query,
                record.response,
                suggested,
                referenced,
                format_timestamp(&record.created_at),
            ],
        )
        .map_err(|e| NeighborlyError::Persistence(e.to_string()))?;

        debug!("Saved interaction {}", record.id);
        Ok(())
    }
}
