//! In-process storage backend.
//!
//! Every operation runs under one exclusive lock over the whole entry map, so
//! operations are fully serialized: no reader overlaps a writer and publish
//! cannot interleave with another publish. Meant for tests and ephemeral
//! deployments, not for large registries (`list` sorts a copy of the map on
//! every call).

use super::filter::{normalize_limit, validate_cursor, ListFilter, ListPage};
use super::publish::{check_version, latest_entry, stamp_new_entry, validate_publish};
use super::seed::{load_seed_file, parse_seed_record, SeedReport};
use super::traits::{ConnectionInfo, StorageBackend};
use crate::config::BackendKind;
use crate::error::{RegistryError, Result};
use crate::models::{Server, ServerDetail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// In-memory backend keyed by entry id.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, ServerDetail>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-built entries, stored as given.
    pub fn with_entries(entries: impl IntoIterator<Item = ServerDetail>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Number of stored entries, all versions included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list(
        &self,
        filter: &ListFilter,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<ListPage> {
        if let Some(cursor) = cursor {
            validate_cursor(cursor)?;
        }
        let limit = normalize_limit(limit) as usize;

        let entries = self.entries.lock().await;

        let mut servers: Vec<Server> = entries
            .values()
            .map(ServerDetail::summary)
            .filter(|server| filter.matches(server))
            .collect();

        servers.sort_by(|a, b| a.id.cmp(&b.id));

        // An unknown cursor restarts from the first entry.
        let start = cursor
            .and_then(|c| servers.iter().position(|s| s.id == c))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let end = start.saturating_add(limit).min(servers.len());

        let next_cursor = if end < servers.len() && end > start {
            Some(servers[end - 1].id.clone())
        } else {
            None
        };
        let page = servers
            .get(start..end)
            .map(|slice| slice.to_vec())
            .unwrap_or_default();

        Ok(ListPage {
            servers: page,
            next_cursor,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<ServerDetail> {
        let entries = self.entries.lock().await;
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    async fn publish(&self, detail: ServerDetail) -> Result<ServerDetail> {
        validate_publish(&detail)?;

        // No await point past this lock: the check, insert and demotion
        // either all happen or none do.
        let mut entries = self.entries.lock().await;

        check_version(
            &detail.name,
            detail.version(),
            entries
                .values()
                .filter(|e| e.name == detail.name)
                .map(|e| e.version()),
        )?;

        let stored = stamp_new_entry(detail);

        for entry in entries.values_mut().filter(|e| e.name == stored.name) {
            entry.version_detail.is_latest = false;
        }
        entries.insert(stored.id.clone(), stored.clone());

        debug!(
            "Published {} version {} as {}",
            stored.name,
            stored.version(),
            stored.id
        );

        Ok(stored)
    }

    async fn import_seed(&self, path: &Path) -> Result<SeedReport> {
        let records = load_seed_file(path).await?;
        let total = records.len();
        info!("Importing {} servers into memory database", total);

        let mut report = SeedReport {
            total,
            ..Default::default()
        };

        let mut entries = self.entries.lock().await;
        let mut touched: HashSet<String> = HashSet::new();
        for (i, record) in records.into_iter().enumerate() {
            let Some(detail) = parse_seed_record(i, record) else {
                report.skipped += 1;
                continue;
            };

            // Insert-only: never overwrite what is already stored.
            if entries.contains_key(&detail.id) {
                debug!("[{}/{}] Server {} already present, skipping", i + 1, total, detail.id);
                report.skipped += 1;
                continue;
            }
            if entries
                .values()
                .any(|e| e.name == detail.name && e.version() == detail.version())
            {
                debug!(
                    "[{}/{}] Server {} version {} already present, skipping",
                    i + 1,
                    total,
                    detail.name,
                    detail.version()
                );
                report.skipped += 1;
                continue;
            }

            debug!("[{}/{}] Imported server: {}", i + 1, total, detail.name);
            touched.insert(detail.name.clone());
            entries.insert(detail.id.clone(), detail);
            report.imported += 1;
        }

        for name in &touched {
            let latest = latest_entry(
                entries
                    .values()
                    .filter(|e| &e.name == name)
                    .map(|e| (e.id.as_str(), e.version())),
            )
            .map(str::to_string);

            for entry in entries.values_mut().filter(|e| &e.name == name) {
                entry.version_detail.is_latest = latest.as_deref() == Some(entry.id.as_str());
            }
        }

        info!(
            "Memory database import completed: {} imported, {} skipped",
            report.imported, report.skipped
        );
        Ok(report)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            kind: BackendKind::Memory,
            is_connected: true,
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Repository;
    use serde_json::json;
    use tempfile::TempDir;

    fn detail(name: &str, version: &str) -> ServerDetail {
        ServerDetail::new(
            name,
            format!("{} server", name),
            Repository {
                url: format!("https://github.com/acme/{}", name),
                source: "github".into(),
                id: name.into(),
            },
            version,
        )
    }

    #[tokio::test]
    async fn test_publish_assigns_id_and_latest() {
        let backend = MemoryBackend::new();
        let stored = backend.publish(detail("weather", "1.0.0")).await.unwrap();

        assert!(uuid::Uuid::parse_str(&stored.id).is_ok());
        assert!(stored.is_latest());

        let fetched = backend.get_by_id(&stored.id).await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_publish_demotes_previous_latest() {
        let backend = MemoryBackend::new();
        let v1 = backend.publish(detail("weather", "1.0.0")).await.unwrap();
        let v2 = backend.publish(detail("weather", "2.0.0")).await.unwrap();

        assert!(!backend.get_by_id(&v1.id).await.unwrap().is_latest());
        assert!(backend.get_by_id(&v2.id).await.unwrap().is_latest());
    }

    #[tokio::test]
    async fn test_returned_detail_is_a_copy() {
        let backend = MemoryBackend::new();
        let stored = backend.publish(detail("weather", "1.0.0")).await.unwrap();

        let mut fetched = backend.get_by_id(&stored.id).await.unwrap();
        fetched.description = "tampered".into();
        fetched.version_detail.is_latest = false;

        let again = backend.get_by_id(&stored.id).await.unwrap();
        assert_eq!(again.description, "weather server");
        assert!(again.is_latest());
    }

    #[tokio::test]
    async fn test_list_ignores_unknown_filter_keys() {
        let backend = MemoryBackend::new();
        backend.publish(detail("weather", "1.0.0")).await.unwrap();

        let filter = ListFilter::new().with("version_detail.is_latest", "false");
        let page = backend.list(&filter, None, 0).await.unwrap();
        assert_eq!(page.servers.len(), 1);
    }

    #[tokio::test]
    async fn test_list_includes_every_version() {
        let backend = MemoryBackend::new();
        backend.publish(detail("weather", "1.0.0")).await.unwrap();
        backend.publish(detail("weather", "1.1.0")).await.unwrap();

        let page = backend
            .list(&ListFilter::new().name("weather"), None, 10)
            .await
            .unwrap();
        assert_eq!(page.servers.len(), 2);
        assert_eq!(page.servers.iter().filter(|s| s.version_detail.is_latest).count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_cursor_starts_from_beginning() {
        let backend = MemoryBackend::new();
        for name in ["a", "b", "c"] {
            backend.publish(detail(name, "1.0.0")).await.unwrap();
        }

        let cursor = uuid::Uuid::new_v4().to_string();
        let page = backend
            .list(&ListFilter::new(), Some(&cursor), 2)
            .await
            .unwrap();
        let first = backend.list(&ListFilter::new(), None, 2).await.unwrap();
        assert_eq!(page, first);
    }

    #[tokio::test]
    async fn test_seed_import_is_insert_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seed.json");
        let id = "0b5a1a36-4f4e-4a43-9a47-2c6d9c0f7a10";
        let record = |description: &str| {
            json!({
                "id": id,
                "name": "weather",
                "description": description,
                "repository": {"url": "https://github.com/acme/weather", "source": "github", "id": "1"},
                "version_detail": {"version": "1.0.0", "release_date": "2025-01-01T00:00:00Z", "is_latest": true}
            })
        };

        std::fs::write(&path, json!([record("first")]).to_string()).unwrap();
        let backend = MemoryBackend::new();
        let report = backend.import_seed(&path).await.unwrap();
        assert_eq!(report.imported, 1);

        std::fs::write(&path, json!([record("second")]).to_string()).unwrap();
        let report = backend.import_seed(&path).await.unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, 1);

        let stored = backend.get_by_id(id).await.unwrap();
        assert_eq!(stored.description, "first");
    }

    #[tokio::test]
    async fn test_seed_recomputes_latest_per_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seed.json");
        let repo = json!({"url": "https://github.com/acme/weather", "source": "github", "id": "1"});
        let records = json!([
            {"id": "0b5a1a36-4f4e-4a43-9a47-2c6d9c0f7a11", "name": "weather", "repository": repo,
             "version_detail": {"version": "1.5.0", "is_latest": true}},
            {"id": "0b5a1a36-4f4e-4a43-9a47-2c6d9c0f7a12", "name": "weather", "repository": repo,
             "version_detail": {"version": "2.0.0"}}
        ]);
        std::fs::write(&path, records.to_string()).unwrap();

        let backend = MemoryBackend::new();
        let published = backend.publish(detail("weather", "1.0.0")).await.unwrap();
        assert_eq!(backend.import_seed(&path).await.unwrap().imported, 2);

        let latest: Vec<_> = backend
            .list(&ListFilter::new(), None, 10)
            .await
            .unwrap()
            .servers
            .into_iter()
            .filter(|s| s.version_detail.is_latest)
            .collect();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version_detail.version, "2.0.0");
        assert!(!backend.get_by_id(&published.id).await.unwrap().is_latest());
    }

    #[tokio::test]
    async fn test_close_is_noop() {
        let backend = MemoryBackend::new();
        backend.close().await.unwrap();
        backend.close().await.unwrap();
        assert!(backend.connection_info().is_connected);
        assert_eq!(backend.connection_info().kind, BackendKind::Memory);
    }
}
