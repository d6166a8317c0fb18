//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise degrade on every call.

use crate::config::Settings;
use crate::error::{NeighborlyError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Asking questions requires the provider API key.
    Ask,
    /// Backfilling embeddings requires the provider API key.
    Backfill,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Backfill => check_api_key(settings),
    }
}

/// Check if the provider API key is configured.
fn check_api_key(settings: &Settings) -> Result<()> {
    if settings.api_key().is_some() {
        return Ok(());
    }
    let var = &settings.provider.api_key_env;
    Err(NeighborlyError::Config(format!(
        "{} is not set or empty. Set it with: export {}='...'",
        var, var
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_backfill_requires_key() {
        let mut settings = Settings::default();
        settings.provider.api_key_env = "NEIGHBORLY_TEST_UNSET_BACKFILL_KEY".to_string();
        let err = check(Operation::Backfill, &settings).unwrap_err();
        assert!(err.to_string().contains("not set or empty"));
    }

    #[test]
    fn test_check_ask_reports_configured_variable() {
        let mut settings = Settings::default();
        settings.provider.api_key_env = "NEIGHBORLY_TEST_UNSET_KEY".to_string();
        let err = check(Operation::Ask, &settings).unwrap_err();
        assert!(err.to_string().contains("NEIGHBORLY_TEST_UNSET_KEY"));
    }
}
