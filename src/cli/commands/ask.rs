//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, user: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'neighborly doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching community posts...");
    let response = orchestrator.answer(question, user).await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.text);

    if !response.retrieved_documents.is_empty() {
        Output::header("Related posts");
        for (i, doc) in response.retrieved_documents.iter().enumerate() {
            Output::source(i + 1, doc);
        }
    }

    Output::header("You could also ask");
    for suggestion in &response.suggested_questions {
        Output::list_item(suggestion);
    }

    if response.is_degraded() {
        println!();
        Output::warning(&format!(
            "Answer was degraded: {:?}. Run with -v for details.",
            response.degradations
        ));
    }

    Ok(())
}
