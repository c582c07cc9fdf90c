//! Registry service: the only path clients use to reach a backend.
//!
//! Applies the client-facing page default, puts a deadline on every backend
//! call and rejects empty publish payloads before the backend sees them.
//! Backend errors pass through unchanged.

use crate::config::ServiceConfig;
use crate::error::{RegistryError, Result};
use crate::models::ServerDetail;
use crate::storage::{ConnectionInfo, ListFilter, ListPage, StorageBackend};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Orchestrates calls into the active storage backend.
#[derive(Clone)]
pub struct RegistryService {
    backend: Arc<dyn StorageBackend>,
    timeout: Duration,
}

impl RegistryService {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_timeout(backend, ServiceConfig::OPERATION_TIMEOUT)
    }

    pub fn with_timeout(backend: Arc<dyn StorageBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Deadline applied to each backend call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// List summaries. `limit <= 0` becomes the service page default.
    pub async fn list(
        &self,
        filter: &ListFilter,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<ListPage> {
        let limit = if limit <= 0 {
            ServiceConfig::DEFAULT_PAGE_LIMIT
        } else {
            limit
        };
        self.with_deadline("list", self.backend.list(filter, cursor, limit))
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<ServerDetail> {
        self.with_deadline("get_by_id", self.backend.get_by_id(id))
            .await
    }

    /// Publish a new version; `None` is rejected without touching the backend.
    ///
    /// On a deadline miss the outcome is unknown: the entry may or may not
    /// have been stored, so re-query before retrying.
    pub async fn publish(&self, detail: Option<ServerDetail>) -> Result<ServerDetail> {
        let detail =
            detail.ok_or_else(|| RegistryError::invalid_input("Server detail is required"))?;
        self.with_deadline("publish", self.backend.publish(detail))
            .await
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        self.backend.connection_info()
    }

    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    async fn with_deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} exceeded deadline of {:?}", operation, self.timeout);
                Err(RegistryError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}
