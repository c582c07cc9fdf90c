//! Publish rules every backend applies before writing.

use crate::error::{RegistryError, Result};
use crate::models::ServerDetail;
use crate::version::{compare_versions, max_version};
use chrono::Utc;
use std::cmp::Ordering;

/// Reject details missing a name or repository URL.
pub fn validate_publish(detail: &ServerDetail) -> Result<()> {
    if detail.name.is_empty() {
        return Err(RegistryError::invalid_input("Server name is required"));
    }
    if detail.repository.url.is_empty() {
        return Err(RegistryError::invalid_input("Repository URL is required"));
    }
    Ok(())
}

/// Check `version` against the versions already stored under `name`.
///
/// A version that compares equal to an existing one is a duplicate, so `1.2`
/// conflicts with a stored `1.2.0`. Anything below the greatest stored version
/// is a downgrade.
pub fn check_version<'a, I>(name: &str, version: &str, existing: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let existing: Vec<&str> = existing.into_iter().collect();

    if existing
        .iter()
        .any(|v| compare_versions(v, version) == Ordering::Equal)
    {
        return Err(RegistryError::AlreadyExists {
            name: name.to_string(),
            version: version.to_string(),
        });
    }

    if let Some(latest) = max_version(existing.iter().copied()) {
        if compare_versions(version, latest) == Ordering::Less {
            return Err(RegistryError::InvalidVersion {
                version: version.to_string(),
                latest: latest.to_string(),
            });
        }
    }

    Ok(())
}

/// Assign the id, release date and latest flag of a freshly published entry.
pub fn stamp_new_entry(mut detail: ServerDetail) -> ServerDetail {
    detail.id = uuid::Uuid::new_v4().to_string();
    detail.version_detail.is_latest = true;
    detail.version_detail.release_date = Utc::now();
    detail
}

/// Id of the entry that should carry the latest flag among `(id, version)`
/// pairs of one name.
///
/// The greatest version wins; among versions that compare equal the smaller
/// id wins, so the choice does not depend on iteration order.
pub fn latest_entry<'a, I>(entries: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    entries
        .into_iter()
        .fold(None, |best: Option<(&'a str, &'a str)>, (id, version)| match best {
            None => Some((id, version)),
            Some((best_id, current)) => match compare_versions(version, current) {
                Ordering::Greater => Some((id, version)),
                Ordering::Equal if id < best_id => Some((id, version)),
                _ => best,
            },
        })
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Repository;

    fn detail(name: &str, url: &str) -> ServerDetail {
        ServerDetail::new(
            name,
            "",
            Repository {
                url: url.into(),
                source: "github".into(),
                id: "1".into(),
            },
            "1.0.0",
        )
    }

    #[test]
    fn test_validate_publish() {
        assert!(validate_publish(&detail("weather", "https://x")).is_ok());
        assert!(matches!(
            validate_publish(&detail("", "https://x")),
            Err(RegistryError::InvalidInput { .. })
        ));
        assert!(matches!(
            validate_publish(&detail("weather", "")),
            Err(RegistryError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_check_version_first_publish() {
        assert!(check_version("weather", "0.1.0", Vec::<&str>::new()).is_ok());
    }

    #[test]
    fn test_check_version_duplicate_and_downgrade() {
        let existing = ["1.0.0", "2.0.0"];
        assert!(matches!(
            check_version("weather", "2.0.0", existing),
            Err(RegistryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            check_version("weather", "2.0", existing),
            Err(RegistryError::AlreadyExists { .. })
        ));
        match check_version("weather", "1.5.0", existing) {
            Err(RegistryError::InvalidVersion { latest, .. }) => assert_eq!(latest, "2.0.0"),
            other => panic!("expected InvalidVersion, got {:?}", other),
        }
        assert!(check_version("weather", "2.0.1", existing).is_ok());
    }

    #[test]
    fn test_stamp_new_entry_replaces_client_id() {
        let mut d = detail("weather", "https://x");
        d.id = "client-chosen".into();
        let stamped = stamp_new_entry(d);
        assert_ne!(stamped.id, "client-chosen");
        assert!(uuid::Uuid::parse_str(&stamped.id).is_ok());
        assert!(stamped.is_latest());
    }

    #[test]
    fn test_latest_entry() {
        assert_eq!(latest_entry(Vec::<(&str, &str)>::new()), None);
        assert_eq!(
            latest_entry([("a", "1.0.0"), ("b", "1.10.0"), ("c", "1.9.0")]),
            Some("b")
        );
        assert_eq!(latest_entry([("b", "1.2"), ("a", "1.2.0")]), Some("a"));
        assert_eq!(latest_entry([("a", "1.2"), ("b", "1.2.0")]), Some("a"));
    }
}
