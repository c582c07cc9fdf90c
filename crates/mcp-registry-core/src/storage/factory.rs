//! Backend construction from startup settings.

use super::memory::MemoryBackend;
use super::sqlite::SqliteBackend;
use super::traits::StorageBackend;
use crate::config::{BackendKind, StorageSettings};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Create the backend selected by `settings`.
///
/// Opening a SQLite backend touches the filesystem and creates the schema, so
/// this blocks; call it during startup, before serving requests.
pub fn open_backend(settings: &StorageSettings) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match settings.kind {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(
            &settings.database_url,
            &settings.collection_name,
        )?),
    };

    info!("Using {} storage backend", settings.kind);
    Ok(backend)
}
