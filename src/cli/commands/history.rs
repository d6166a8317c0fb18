//! History command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the history command.
pub async fn run_history(user: &str, limit: usize, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let records = match orchestrator.recent_interactions(user, limit).await {
        Ok(records) => records,
        Err(e) => {
            Output::error(&format!("Failed to read history: {}", e));
            return Err(e.into());
        }
    };

    if records.is_empty() {
        Output::info(&format!("No interactions recorded for '{}'.", user));
        return Ok(());
    }

    Output::header(&format!("Recent interactions for {}", user));
    for record in &records {
        Output::interaction(record);
    }

    Ok(())
}
