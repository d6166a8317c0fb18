//! In-memory interaction history.

use super::{InteractionHistory, InteractionRecord};
use crate::error::{NeighborlyError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory history. Records are kept in append order.
pub struct MemoryHistory {
    records: RwLock<Vec<InteractionRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionHistory for MemoryHistory {
    async fn recent(&self, user_id: &str, n: usize) -> Result<Vec<InteractionRecord>> {
        let records = self.records.read().map_err(|e| {
            NeighborlyError::HistoryUnavailable(format!("Failed to acquire lock: {}", e))
        })?;

        // Reverse append order first so equal timestamps still come out newest first
        let mut matching: Vec<InteractionRecord> = records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(n);

        Ok(matching)
    }

    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|e| {
            NeighborlyError::Persistence(format!("Failed to acquire lock: {}", e))
        })?;
        records.push(record.clone());
        Ok(())
    }
}
