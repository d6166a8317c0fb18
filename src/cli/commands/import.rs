//! Import command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::store::Document;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the import command.
pub async fn run_import(file: &str, settings: Settings) -> Result<()> {
    let documents = read_documents(Path::new(file))?;

    if documents.is_empty() {
        Output::warning(&format!("No posts found in {}", file));
        return Ok(());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let count = orchestrator.import_documents(&documents).await?;

    Output::success(&format!("Imported {} posts.", count));
    Output::info("Run 'neighborly backfill' to embed them now, or let the next question do it.");

    Ok(())
}

/// Parse a JSON array of documents. Missing ids and timestamps are generated.
fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let documents: Vec<Document> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of posts", path.display()))?;
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_documents_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"title": "Block party", "body": "Saturday at noon.", "category": "news",
                  "author": {{"id": "u1", "displayName": "Dana"}}}},
                {{"id": "p2", "title": "Lost cat", "body": "Grey tabby.", "category": "discussion",
                  "author": {{"id": "u2"}}, "createdAt": "2024-03-01T12:00:00Z"}}
            ]"#
        )
        .unwrap();

        let docs = read_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(!docs[0].id.is_empty());
        assert_eq!(docs[0].author.display(), "Dana");
        assert_eq!(docs[1].id, "p2");
        assert_eq!(docs[1].author.display(), "Unknown");
        assert!(!docs[1].has_embedding());
    }

    #[test]
    fn test_read_documents_ignores_supplied_embedding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"title": "Garden swap", "body": "Bring seedlings.", "category": "news",
                 "author": {{"id": "u3"}}, "embedding": [0.5, 0.5]}}]"#
        )
        .unwrap();

        let docs = read_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(!docs[0].has_embedding());
    }

    #[test]
    fn test_read_documents_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"title": "x"}}"#).unwrap();
        assert!(read_documents(file.path()).is_err());
    }
}
