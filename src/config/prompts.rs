//! Prompt templates for Neighborly.
//!
//! Prompts can be customized by placing an `assistant.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Templates for the community assistant prompt.
///
/// Placeholders: `{{query}}` in `question`; `{{title}}`, `{{author}}`,
/// `{{category}}`, `{{body}}` in `document`; `{{query}}`, `{{response}}`
/// in `history_entry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub system: String,
    pub question: String,
    pub documents_header: String,
    pub document: String,
    pub history_header: String,
    pub history_entry: String,
    pub no_documents: String,
    pub instructions: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful community assistant that helps users find relevant information from community discussions.".to_string(),

            question: r#"A user has asked: "{{query}}""#.to_string(),

            documents_header: "Here are some relevant community posts that might address the query:".to_string(),

            document: r#"Title: "{{title}}"
Author: {{author}}
Category: {{category}}
Content: "{{body}}""#.to_string(),

            history_header: "Previous interactions:".to_string(),

            history_entry: r#"User asked: "{{query}}"
AI responded: "{{response}}...""#.to_string(),

            no_documents: "I couldn't find any community posts directly related to this query. Please provide a general response based on your general knowledge.".to_string(),

            instructions: r#"Based on the above information, please:
1. Provide a helpful response to the user's query.
2. If the query is ambiguous, ask for clarification.
3. Be concise but informative in your response.
4. Format your response as a friendly community assistant."#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
