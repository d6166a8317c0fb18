//! CLI output formatting utilities.

use crate::history::InteractionRecord;
use crate::store::Document;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a post summary line.
    pub fn document_info(doc: &Document) {
        let embedded = if doc.has_embedding() {
            style("embedded").green()
        } else {
            style("pending").yellow()
        };
        println!(
            "  {} {} ({}, by {}, {}) [{}]",
            style("*").cyan(),
            style(&doc.title).bold(),
            doc.category,
            doc.author.display(),
            style(doc.created_at.format("%Y-%m-%d")).dim(),
            embedded
        );
    }

    /// Print a retrieved post.
    pub fn source(rank: usize, doc: &Document) {
        println!(
            "\n{} {} {} ({})",
            style(format!("{}.", rank)).green(),
            style(&doc.title).bold(),
            style(format!("by {}", doc.author.display())).dim(),
            doc.category
        );
        println!("   {}", content_preview(&doc.body, 200));
    }

    /// Print one past interaction.
    pub fn interaction(record: &InteractionRecord) {
        println!(
            "\n{} {}",
            style(record.created_at.format("%Y-%m-%d %H:%M")).dim(),
            style(&record.query).bold()
        );
        println!("   {}", content_preview(&record.response, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Collapse newlines and truncate with ellipsis on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("line one\nline two", 100), "line one line two");
        assert_eq!(content_preview("ééééé", 3), "ééé...");
    }
}
