//! Storage backend trait and types.

use super::filter::{ListFilter, ListPage};
use super::seed::SeedReport;
use crate::config::BackendKind;
use crate::error::Result;
use crate::models::ServerDetail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backend kind and liveness, for health reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub is_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Storage contract shared by every backend.
///
/// After every successful [`publish`](StorageBackend::publish), for each
/// name there is at most one entry with `is_latest = true` and it holds the
/// greatest version; no two entries share a `(name, version)` pair. Entries
/// are never deleted and the latest flag is the only field that changes after
/// creation.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List summaries sorted by id ascending.
    ///
    /// `limit <= 0` means the backend default. `cursor` must be a valid id
    /// syntactically; where pagination resumes for an unknown cursor is
    /// backend-specific.
    async fn list(&self, filter: &ListFilter, cursor: Option<&str>, limit: i64)
        -> Result<ListPage>;

    /// Fetch one entry. Fails with `NotFound` when no entry has that id.
    async fn get_by_id(&self, id: &str) -> Result<ServerDetail>;

    /// Publish a new version.
    ///
    /// Assigns a fresh id, stamps the release date, marks the entry latest and
    /// demotes every other entry of the same name. Returns the stored record.
    ///
    /// Fails with `InvalidInput` (missing name or repository URL),
    /// `AlreadyExists` (same name and an equal version) or `InvalidVersion`
    /// (older than the current greatest version).
    async fn publish(&self, detail: ServerDetail) -> Result<ServerDetail>;

    /// Bulk-load entries from a JSON seed file.
    ///
    /// Bad records are logged and skipped. Afterwards each name the import
    /// touched has exactly one latest entry, its greatest version. Fails only
    /// when the file cannot be read or is not a JSON array.
    async fn import_seed(&self, path: &Path) -> Result<SeedReport>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> Result<()>;

    fn connection_info(&self) -> ConnectionInfo;
}
