//! Doctor command - verify configuration, store and provider connectivity.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, SelfTestReport};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Neighborly Doctor");
    println!();
    println!("Checking configuration and providers...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    let has_key = api_check.status != CheckStatus::Error;
    checks.push(api_check);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings);
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    println!("{}", style("Integration").bold());
    let integration_checks = if has_key {
        match Orchestrator::new(settings.clone()) {
            Ok(orchestrator) => {
                let mut results = vec![check_corpus(&orchestrator).await];
                let spinner = Output::spinner("Running integration self-test...");
                let report = orchestrator.self_test().await;
                spinner.finish_and_clear();
                results.extend(self_test_checks(&report));
                results
            }
            Err(e) => vec![CheckResult::error(
                "Orchestrator",
                &format!("failed to start: {}", e),
                "Check the store and provider settings",
            )],
        }
    } else {
        vec![CheckResult::warning(
            "Self-test",
            "skipped",
            "Configure the API key to run the integration self-test",
        )]
    };
    for check in &integration_checks {
        check.print();
    }
    checks.extend(integration_checks);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Neighborly.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Neighborly is ready to use.");
    }

    Ok(())
}

/// Check if the provider API key is configured.
fn check_api_key(settings: &Settings) -> CheckResult {
    let var = settings.provider.api_key_env.as_str();
    match std::env::var(var) {
        Ok(key) if key.chars().count() > 12 => {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            CheckResult::ok(var, &format!("configured ({}...{})", head, tail))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            var,
            "empty",
            &format!("Set with: export {}='...'", var),
        ),
        Ok(_) => CheckResult::warning(
            var,
            "set but looks too short",
            "Double-check the key with your provider",
        ),
        Err(_) => CheckResult::error(
            var,
            "not set",
            &format!("Set with: export {}='...'", var),
        ),
    }
}

/// Check data directories and the database file.
fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok(
            "Data directory",
            &format!("{}", data_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if settings.store.provider == "memory" {
        results.push(CheckResult::warning(
            "Store",
            "in-memory (nothing is kept between runs)",
            "Set store.provider = \"sqlite\" to keep posts and history",
        ));
        return results;
    }

    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Database",
            &format!("{} ({})", db_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first import",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: neighborly config edit",
        )
    }
}

/// Count posts and how many still need an embedding.
async fn check_corpus(orchestrator: &Orchestrator) -> CheckResult {
    let documents = orchestrator.documents();
    match (documents.document_count().await, documents.list_missing_embeddings().await) {
        (Ok(0), _) => CheckResult::warning(
            "Posts",
            "none",
            "Import posts with: neighborly import <file.json>",
        ),
        (Ok(total), Ok(missing)) if missing.is_empty() => {
            CheckResult::ok("Posts", &format!("{} (all embedded)", total))
        }
        (Ok(total), Ok(missing)) => CheckResult::warning(
            "Posts",
            &format!("{} ({} without embeddings)", total, missing.len()),
            "Run: neighborly backfill",
        ),
        (Err(e), _) | (_, Err(e)) => CheckResult::error(
            "Posts",
            &format!("store unreadable: {}", e),
            "Check store.sqlite_path",
        ),
    }
}

/// Turn the self-test report into one check per stage.
fn self_test_checks(report: &SelfTestReport) -> Vec<CheckResult> {
    let stage = |name: &str, passed: bool, hint: &str| {
        if passed {
            CheckResult::ok(name, "passed")
        } else {
            CheckResult::error(name, "failed", hint)
        }
    };

    vec![
        stage(
            "Embedding",
            report.embedding,
            "Check embedding.model and provider.api_base (run with -v for details)",
        ),
        stage(
            "Retrieval",
            report.retrieval,
            "Check the store and the embedding provider",
        ),
        stage(
            "Generation",
            report.generation,
            "Check generation.model and provider.api_base (run with -v for details)",
        ),
    ]
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
