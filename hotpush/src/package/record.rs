//! Persisted update records.
//!
//! Three small JSON documents make up the durable state of the update store:
//!
//! - [`PackageRecord`]: per-version metadata, written into the version
//!   folder after a download completes
//! - [`StatusRecord`]: the single pointer to the currently installed version
//! - [`DiffManifest`]: the deletion list shipped inside a diff payload
//!
//! Field names are wire format shared with the update publisher, so all
//! records serialize with camelCase keys.

use serde::{Deserialize, Serialize};

/// Metadata for one downloaded update version.
///
/// Created when a download completes successfully and persisted inside the
/// version folder; immutable thereafter. One record exists per label.
///
/// # Example
///
/// ```
/// use hotpush::package::PackageRecord;
///
/// let record = PackageRecord::new("14", "https://updates.example.com/v14");
///
/// assert_eq!(record.label, "14");
/// assert!(record.relative_bundle_path.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    /// Unique identifier for this update version; also its folder name.
    pub label: String,

    /// URL the payload was downloaded from.
    pub download_url: String,

    /// Bundle location relative to the version folder.
    ///
    /// Absent for raw (single-file) payloads, where the bundle sits directly
    /// under the version folder with the expected bundle file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_bundle_path: Option<String>,

    /// Binary application version this update targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Modification time of the binary the update was built against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_modified_time: Option<String>,

    /// Publisher-supplied content hash of the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_hash: Option<String>,
}

impl PackageRecord {
    /// Create a record with the required fields; optional fields start empty.
    pub fn new(label: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            download_url: download_url.into(),
            relative_bundle_path: None,
            app_version: None,
            binary_modified_time: None,
            package_hash: None,
        }
    }
}

/// The singleton status record at the store root.
///
/// Records which version label is current. Absence of the file, or of the
/// label, is valid and means "no update installed, run binary content".
///
/// # Example
///
/// ```
/// use hotpush::package::StatusRecord;
///
/// let status = StatusRecord::default();
/// assert!(status.current_label.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Label of the currently installed version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_label: Option<String>,
}

impl StatusRecord {
    /// Create a status record pointing at the given label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            current_label: Some(label.into()),
        }
    }
}

/// Deletion manifest shipped inside a diff payload.
///
/// Lists the files to remove from the base version when applying an
/// incremental update. Transient: parsed during staging and discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffManifest {
    /// Paths to delete, relative to the version folder root.
    #[serde(default)]
    pub deleted_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_record_round_trip() {
        let mut record = PackageRecord::new("3", "https://example.com/update");
        record.relative_bundle_path = Some("dist/index.bundle".to_string());
        record.app_version = Some("4.34".to_string());
        record.package_hash = Some("abc123".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: PackageRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record, parsed);
    }

    #[test]
    fn test_package_record_camel_case_keys() {
        let mut record = PackageRecord::new("3", "https://example.com/update");
        record.relative_bundle_path = Some("index.bundle".to_string());

        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"downloadUrl\""));
        assert!(json.contains("\"relativeBundlePath\""));
        assert!(!json.contains("download_url"));
    }

    #[test]
    fn test_package_record_optional_fields_omitted() {
        let record = PackageRecord::new("3", "https://example.com/update");
        let json = serde_json::to_string(&record).unwrap();

        assert!(!json.contains("relativeBundlePath"));
        assert!(!json.contains("appVersion"));
        assert!(!json.contains("binaryModifiedTime"));
        assert!(!json.contains("packageHash"));
    }

    #[test]
    fn test_package_record_parses_minimal_json() {
        let record: PackageRecord =
            serde_json::from_str(r#"{"label":"7","downloadUrl":"https://example.com/u"}"#).unwrap();

        assert_eq!(record.label, "7");
        assert!(record.relative_bundle_path.is_none());
        assert!(record.app_version.is_none());
    }

    #[test]
    fn test_status_record_round_trip() {
        let status = StatusRecord::with_label("12");

        let json = serde_json::to_string(&status).unwrap();
        let parsed: StatusRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(status, parsed);
        assert!(json.contains("\"currentLabel\""));
    }

    #[test]
    fn test_status_record_empty_object_is_default() {
        let parsed: StatusRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, StatusRecord::default());
    }

    #[test]
    fn test_diff_manifest_parses_deleted_files() {
        let manifest: DiffManifest =
            serde_json::from_str(r#"{"deletedFiles":["b.txt","sub/old.bin"]}"#).unwrap();

        assert_eq!(manifest.deleted_files, vec!["b.txt", "sub/old.bin"]);
    }

    #[test]
    fn test_diff_manifest_missing_list_is_empty() {
        let manifest: DiffManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.deleted_files.is_empty());
    }
}
