//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::entity::{BlueprintData, BlueprintRecord};
use crate::core::lifecycle::BlueprintService;
use crate::core::store::SqliteStore;
use crate::core::Config;

/// Open the lifecycle engine over the configured database
pub fn open_service(config: &Config) -> Result<BlueprintService<SqliteStore>> {
    let path = config.database();
    debug!(database = %path.display(), "opening blueprint database");
    let store = SqliteStore::open_with_timeout(&path, config.lock_timeout())?;
    Ok(BlueprintService::new(store))
}

/// Read a transfer document from a JSON file
pub fn read_blueprint_file(path: &Path) -> Result<BlueprintData> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not a blueprint document", path.display()))
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

/// JSON view of a record, carrying the external id instead of the row id
pub fn record_json(record: &BlueprintRecord) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record).into_diagnostic()?;
    value["id"] = serde_json::Value::String(record.blueprint_id().to_string());
    Ok(value)
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
