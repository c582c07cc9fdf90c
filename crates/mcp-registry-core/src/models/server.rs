//! Registry entry shapes.

use super::package::{Package, Remote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source code repository of a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    pub source: String,
    pub id: String,
}

/// Version metadata of one published entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDetail {
    #[serde(default)]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub release_date: DateTime<Utc>,
    #[serde(default)]
    pub is_latest: bool,
}

impl VersionDetail {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_date: Utc::now(),
            is_latest: false,
        }
    }
}

/// Summary view of an entry, used in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub description: String,
    pub repository: Repository,
    pub version_detail: VersionDetail,
}

/// Detail view of an entry. This is the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDetail {
    /// Assigned by the backend on publish; any client-supplied value is replaced.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub repository: Repository,
    pub version_detail: VersionDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<Package>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remotes: Option<Vec<Remote>>,
}

impl ServerDetail {
    /// Start a detail for publishing. `id` stays empty until a backend assigns it.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        repository: Repository,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
            repository,
            version_detail: VersionDetail::new(version),
            packages: None,
            remotes: None,
        }
    }

    pub fn version(&self) -> &str {
        &self.version_detail.version
    }

    pub fn is_latest(&self) -> bool {
        self.version_detail.is_latest
    }

    /// Project onto the summary view (drops packages and remotes).
    pub fn summary(&self) -> Server {
        Server {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            repository: self.repository.clone(),
            version_detail: self.version_detail.clone(),
        }
    }
}

impl From<&ServerDetail> for Server {
    fn from(detail: &ServerDetail) -> Self {
        detail.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_detail() -> ServerDetail {
        let mut detail = ServerDetail::new(
            "io.github.acme/weather",
            "Weather lookups",
            Repository {
                url: "https://github.com/acme/weather".into(),
                source: "github".into(),
                id: "acme/weather".into(),
            },
            "1.0.0",
        );
        detail.packages = Some(vec![Package {
            registry_name: "npm".into(),
            name: "@acme/weather".into(),
            version: "1.0.0".into(),
            ..Default::default()
        }]);
        detail
    }

    #[test]
    fn test_summary_drops_packages_and_remotes() {
        let detail = sample_detail();
        let summary = detail.summary();
        assert_eq!(summary.name, detail.name);
        assert_eq!(summary.version_detail, detail.version_detail);

        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("packages").is_none());
        assert!(value.get("remotes").is_none());
    }

    #[test]
    fn test_detail_omits_absent_optionals() {
        let mut detail = sample_detail();
        detail.packages = None;
        let value = serde_json::to_value(&detail).unwrap();
        assert!(value.get("packages").is_none());
        assert_eq!(value["version_detail"]["version"], "1.0.0");
    }

    #[test]
    fn test_seed_shaped_record_parses() {
        let detail: ServerDetail = serde_json::from_value(json!({
            "id": "0b5a1a36-4f4e-4a43-9a47-2c6d9c0f7a10",
            "name": "io.github.acme/files",
            "description": "File access",
            "repository": {"url": "https://github.com/acme/files", "source": "github", "id": "1"},
            "version_detail": {
                "version": "0.3.1",
                "release_date": "2025-01-20T10:00:00Z",
                "is_latest": true
            },
            "remotes": [{"transport_type": "sse", "url": "https://files.acme.dev/sse"}]
        }))
        .unwrap();

        assert!(detail.is_latest());
        assert_eq!(detail.version(), "0.3.1");
        assert_eq!(detail.remotes.unwrap()[0].transport_type, "sse");
    }

    #[test]
    fn test_missing_version_defaults_empty() {
        let detail: ServerDetail = serde_json::from_value(json!({
            "id": "x",
            "name": "n",
            "repository": {"url": "u", "source": "s", "id": "i"},
            "version_detail": {}
        }))
        .unwrap();
        assert!(detail.version().is_empty());
        assert!(!detail.is_latest());
    }
}
