//! Prompt context assembly.

use crate::config::Prompts;
use crate::history::{InteractionRecord, DEFAULT_RECENT};
use crate::store::Document;
use std::collections::HashMap;

/// Everything the language model receives for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPayload {
    /// Persona / system message.
    pub system: String,
    /// The query, verbatim.
    pub query: String,
    /// Rendered question line.
    pub question: String,
    /// Prior interactions, newest first, already rendered.
    pub history: Vec<String>,
    pub history_header: String,
    /// One rendered block per retrieved document, in ranking order.
    pub documents: Vec<String>,
    pub documents_header: String,
    /// Set when nothing was retrieved; tells the model to answer from general knowledge.
    pub no_documents_notice: Option<String>,
    /// Closing instructions.
    pub instructions: String,
}

impl ContextPayload {
    /// Render the user message.
    pub fn render(&self) -> String {
        let mut sections = vec![self.question.clone()];

        if !self.history.is_empty() {
            sections.push(format!("{}\n{}", self.history_header, self.history.join("\n\n")));
        }

        match &self.no_documents_notice {
            Some(notice) => sections.push(notice.clone()),
            None => sections.push(format!(
                "{}\n{}",
                self.documents_header,
                self.documents.join("\n\n")
            )),
        }

        sections.push(self.instructions.clone());
        sections.join("\n\n")
    }
}

/// Builds a [`ContextPayload`] from retrieved documents and recent history.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    prompts: Prompts,
    history_limit: usize,
    preview_chars: usize,
}

impl ContextAssembler {
    pub fn new(prompts: Prompts) -> Self {
        Self {
            prompts,
            history_limit: DEFAULT_RECENT,
            preview_chars: 100,
        }
    }

    /// Set how many prior interactions are included.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set how much of each prior response is included.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Assemble the payload. `history` is expected newest first.
    pub fn assemble(
        &self,
        query: &str,
        documents: &[Document],
        history: &[InteractionRecord],
    ) -> ContextPayload {
        let templates = &self.prompts.assistant;

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        let question = self.prompts.render_with_custom(&templates.question, &vars);

        let history = history
            .iter()
            .take(self.history_limit)
            .map(|record| {
                let mut vars = HashMap::new();
                vars.insert("query".to_string(), record.query.clone());
                vars.insert(
                    "response".to_string(),
                    preview(&record.response, self.preview_chars),
                );
                self.prompts.render_with_custom(&templates.history_entry, &vars)
            })
            .collect();

        let rendered_documents: Vec<String> = documents
            .iter()
            .map(|doc| {
                let mut vars = HashMap::new();
                vars.insert("title".to_string(), doc.title.clone());
                vars.insert("author".to_string(), doc.author.display().to_string());
                vars.insert("category".to_string(), doc.category.clone());
                vars.insert("body".to_string(), doc.body.clone());
                self.prompts.render_with_custom(&templates.document, &vars)
            })
            .collect();

        let no_documents_notice = rendered_documents
            .is_empty()
            .then(|| self.prompts.render_with_custom(&templates.no_documents, &HashMap::new()));

        ContextPayload {
            system: self.prompts.render_with_custom(&templates.system, &HashMap::new()),
            query: query.to_string(),
            question,
            history,
            history_header: templates.history_header.clone(),
            documents: rendered_documents,
            documents_header: templates.documents_header.clone(),
            no_documents_notice,
            instructions: self.prompts.render_with_custom(&templates.instructions, &HashMap::new()),
        }
    }
}

/// First `max_chars` characters of `text`, on a char boundary.
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
