//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.documents().list().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("No posts yet. Use 'neighborly import <file.json>' to add some.");
            } else {
                Output::header(&format!("Community Posts ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(doc);
                }

                let embedded = documents.iter().filter(|d| d.has_embedding()).count();
                println!();
                Output::kv("Total posts", &documents.len().to_string());
                Output::kv("Embedded", &embedded.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list posts: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
