//! List filters and pagination helpers shared by the backends.

use crate::config::StorageConfig;
use crate::error::{RegistryError, Result};
use crate::models::Server;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields every backend knows how to filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Name,
    RepositoryUrl,
    Id,
    Version,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::Name,
        FilterField::RepositoryUrl,
        FilterField::Id,
        FilterField::Version,
    ];

    /// Key used in a [`ListFilter`].
    pub fn key(&self) -> &'static str {
        match self {
            FilterField::Name => "name",
            FilterField::RepositoryUrl => "repositoryUrl",
            FilterField::Id => "id",
            FilterField::Version => "version",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        FilterField::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Read the matching field off a summary.
    pub fn value_of<'a>(&self, server: &'a Server) -> &'a str {
        match self {
            FilterField::Name => &server.name,
            FilterField::RepositoryUrl => &server.repository.url,
            FilterField::Id => &server.id,
            FilterField::Version => &server.version_detail.version,
        }
    }
}

/// Exact-match filter applied by `list`.
///
/// Keys outside [`FilterField`] are backend-specific: the in-memory backend
/// ignores them, the SQLite backend matches them against the stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    fields: BTreeMap<String, String>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.with(FilterField::Name.key(), name)
    }

    pub fn repository_url(self, url: impl Into<String>) -> Self {
        self.with(FilterField::RepositoryUrl.key(), url)
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.with(FilterField::Id.key(), id)
    }

    pub fn version(self, version: impl Into<String>) -> Self {
        self.with(FilterField::Version.key(), version)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All key/value pairs, recognized or not, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Recognized fields only.
    pub fn known(&self) -> impl Iterator<Item = (FilterField, &str)> {
        self.iter()
            .filter_map(|(k, v)| FilterField::from_key(k).map(|field| (field, v)))
    }

    /// Keys outside the recognized set.
    pub fn unknown(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| FilterField::from_key(k).is_none())
    }

    /// True when every recognized field matches. Unknown keys are ignored.
    pub fn matches(&self, server: &Server) -> bool {
        self.known()
            .all(|(field, value)| field.value_of(server) == value)
    }
}

/// One page of `list` results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub servers: Vec<Server>,
    /// Id of the last returned entry, present only when more entries remain.
    pub next_cursor: Option<String>,
}

/// Map `limit <= 0` to the backend default.
pub fn normalize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        StorageConfig::DEFAULT_LIST_LIMIT
    } else {
        limit
    }
}

/// Cursors are entry ids, which are UUIDs.
pub fn validate_cursor(cursor: &str) -> Result<()> {
    uuid::Uuid::parse_str(cursor)
        .map(|_| ())
        .map_err(|_| RegistryError::invalid_input(format!("Invalid cursor format: {}", cursor)))
}
