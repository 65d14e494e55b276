//! Metadata records kept in the registry.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use super::registry::REGISTRY_FILE;

/// Registry entry describing one stored schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentMetadata {
    /// Build the entry for a save at `now`, keeping `created_at` from the
    /// previous entry when there is one.
    pub(crate) fn for_save(
        id: &str,
        name: &str,
        description: &str,
        previous: Option<&DocumentMetadata>,
        now: String,
    ) -> Self {
        let name = if name.is_empty() { id } else { name };
        let created_at = previous
            .map(|p| p.created_at.clone())
            .unwrap_or_else(|| now.clone());
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at,
            updated_at: now,
        }
    }
}

/// A stored schema: its registry entry plus the raw body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub body: Vec<u8>,
}

/// RFC 3339 timestamp with second precision in UTC, e.g. `2024-05-01T12:00:00Z`.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Identifiers name a directory under the storage root, so anything that
/// could escape it, or that shares a name with the registry and its
/// siblings, is rejected.
pub fn validate_id(id: &str) -> StoreResult<()> {
    let reason = if id.is_empty() {
        "identifier is empty"
    } else if id == "." || id == ".." {
        "identifier is a relative path component"
    } else if id.contains(['/', '\\', '\0']) {
        "identifier contains a path separator or NUL"
    } else if id.starts_with(REGISTRY_FILE) {
        "identifier is reserved for the registry"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidInput {
        id: id.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys_in_order() {
        let meta = DocumentMetadata {
            id: "s1".into(),
            name: "Name A".into(),
            description: "desc".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"id":"s1","name":"Name A","description":"desc","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-02T00:00:00Z"}"#
        );
    }

    #[test]
    fn empty_name_falls_back_to_id() {
        let meta = DocumentMetadata::for_save("s1", "", "", None, "t0".into());
        assert_eq!(meta.name, "s1");
        assert_eq!(meta.created_at, "t0");
        assert_eq!(meta.updated_at, "t0");
    }

    #[test]
    fn overwrite_keeps_created_at() {
        let first = DocumentMetadata::for_save("s1", "A", "", None, "t0".into());
        let second = DocumentMetadata::for_save("s1", "B", "d", Some(&first), "t1".into());
        assert_eq!(second.created_at, "t0");
        assert_eq!(second.updated_at, "t1");
        assert_eq!(second.name, "B");
        assert_eq!(second.description, "d");
    }

    #[test]
    fn rejects_path_like_ids() {
        for bad in ["", ".", "..", "a/b", "a\\b", "a\0b"] {
            assert!(validate_id(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["s1", "user.schema", "my-schema_2", "..hidden"] {
            assert!(validate_id(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn rejects_registry_names() {
        for reserved in [
            "schema-registry.json",
            "schema-registry.json.tmp",
            "schema-registry.json.corrupt-20240101T000000Z",
        ] {
            let err = validate_id(reserved).unwrap_err();
            assert_eq!(err.kind(), crate::storage::ErrorKind::InvalidInput, "{reserved}");
        }
        assert!(validate_id("schema-registry").is_ok());
        assert!(validate_id("my-schema-registry.json").is_ok());
    }

    #[test]
    fn timestamp_is_rfc3339_utc() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
