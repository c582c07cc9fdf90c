//! Seed file loading.
//!
//! A seed file is a JSON array of entry-shaped objects. The file as a whole
//! must be readable and array-shaped; individual records are decoded one at a
//! time so a bad record never sinks the rest.

use crate::config::SeedConfig;
use crate::error::{RegistryError, Result};
use crate::models::ServerDetail;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Outcome of a seed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    /// Records in the source.
    pub total: usize,
    /// Records written to the backend.
    pub imported: usize,
    /// Records skipped as malformed, incomplete or conflicting.
    pub skipped: usize,
}

/// Read a seed file and return its raw records.
///
/// Backends recompute the latest flag of every name an import touches, so a
/// record's own `is_latest` is only a hint.
pub async fn load_seed_file(path: &Path) -> Result<Vec<Value>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RegistryError::invalid_input(format!(
                "Seed file not found: {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(RegistryError::invalid_input(format!(
                "Failed to read seed file {}: {}",
                path.display(),
                e
            )));
        }
    };

    let data: Value = serde_json::from_str(&contents)
        .map_err(|e| RegistryError::invalid_input(format!("Invalid JSON in seed file: {}", e)))?;

    match data {
        Value::Array(records) => Ok(records),
        _ => Err(RegistryError::invalid_input(
            "Seed data must be a list of servers",
        )),
    }
}

/// Decode one seed record, or `None` when it must be skipped.
///
/// `index` is zero-based and only used for log messages. Records need a
/// UUID id and a name. Records without a version get the seed placeholder
/// version and a fresh release date.
pub fn parse_seed_record(index: usize, record: Value) -> Option<ServerDetail> {
    let mut detail: ServerDetail = match serde_json::from_value(record) {
        Ok(detail) => detail,
        Err(e) => {
            warn!("Error importing server {}: {}", index + 1, e);
            return None;
        }
    };

    if detail.id.is_empty() || detail.name.is_empty() {
        warn!("Skipping server {}: ID or Name is empty", index + 1);
        return None;
    }

    // Ids double as list cursors, which must be UUIDs.
    if uuid::Uuid::parse_str(&detail.id).is_err() {
        warn!(
            "Skipping server {}: ID {:?} is not a UUID",
            index + 1,
            detail.id
        );
        return None;
    }

    if detail.version_detail.version.is_empty() {
        detail.version_detail.version = SeedConfig::DEFAULT_SEED_VERSION.to_string();
        detail.version_detail.release_date = Utc::now();
    }

    Some(detail)
}
