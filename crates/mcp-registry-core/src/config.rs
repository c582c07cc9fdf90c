//! Centralized configuration for the registry core.
//!
//! Constants for pagination, deadlines and seed import, plus the settings
//! used to pick a storage backend at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storage-level defaults shared by every backend.
pub struct StorageConfig;

impl StorageConfig {
    /// Page size a backend uses when called with `limit <= 0`.
    pub const DEFAULT_LIST_LIMIT: i64 = 10;
}

/// Service-level defaults. These win over [`StorageConfig`] for client calls.
pub struct ServiceConfig;

impl ServiceConfig {
    pub const DEFAULT_PAGE_LIMIT: i64 = 30;
    pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Seed import configuration.
pub struct SeedConfig;

impl SeedConfig {
    /// Version assigned to seed records that arrive without one.
    pub const DEFAULT_SEED_VERSION: &'static str = "0.0.1-seed";
}

/// SQLite backend configuration.
pub struct SqliteConfig;

impl SqliteConfig {
    pub const BUSY_TIMEOUT_MS: u32 = 5_000;
    pub const DEFAULT_TABLE: &'static str = "servers_v2";
    pub const DEFAULT_DATABASE_URL: &'static str = "data/mcp-registry.sqlite";
    pub const IN_MEMORY_URL: &'static str = ":memory:";
    pub const URL_SCHEME: &'static str = "sqlite://";
}

/// Concrete storage backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(BackendKind::Memory),
            "sqlite" | "persistent" => Some(BackendKind::Sqlite),
            _ => None,
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Sqlite
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings the backend factory reads at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub kind: BackendKind,
    /// SQLite file path, optionally prefixed with `sqlite://`, or `:memory:`.
    pub database_url: String,
    /// Table holding the entries.
    pub collection_name: String,
}

impl StorageSettings {
    pub fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
            ..Self::default()
        }
    }

    pub fn sqlite(database_url: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::Sqlite,
            database_url: database_url.into(),
            collection_name: SqliteConfig::DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_collection(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            database_url: SqliteConfig::DEFAULT_DATABASE_URL.to_string(),
            collection_name: SqliteConfig::DEFAULT_TABLE.to_string(),
        }
    }
}
