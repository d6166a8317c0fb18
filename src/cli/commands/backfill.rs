//! Backfill command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the backfill command.
pub async fn run_backfill(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Backfill, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Generating embeddings for posts...");
    let result = orchestrator.backfill().await;
    spinner.finish_and_clear();

    match result {
        Ok(report) if report.candidates == 0 => {
            Output::success("All posts already have embeddings.");
        }
        Ok(report) => {
            Output::kv("Candidates", &report.candidates.to_string());
            Output::kv("Embedded", &report.succeeded.to_string());
            if report.failed > 0 {
                Output::kv("Failed", &report.failed.to_string());
                Output::warning("Some posts could not be embedded. Run backfill again to retry them.");
            } else {
                Output::success("Backfill complete.");
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list posts: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
