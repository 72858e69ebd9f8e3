//! Durable update store.
//!
//! The [`PackageStore`] owns the store root directory:
//!
//! ```text
//! <root>/
//!     status.json        current-version pointer
//!     download.bin       transient download staging file
//!     staging/           transient archive extraction area
//!     <label>/           one folder per downloaded version
//!         package.json   version metadata, written last
//!         ...            update contents
//! ```
//!
//! All accessors are pure reads/writes over this layout. The store performs
//! no locking; callers serialize access (single-writer discipline).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::package::{PackageRecord, StatusRecord};

use super::error::{UpdateError, UpdateResult};

/// Name of the status file at the store root.
pub const STATUS_FILE_NAME: &str = "status.json";

/// Name of the metadata file inside each version folder.
pub const PACKAGE_FILE_NAME: &str = "package.json";

/// Name of the transient download staging file at the store root.
pub(crate) const DOWNLOAD_FILE_NAME: &str = "download.bin";

/// Name of the transient extraction directory at the store root.
pub(crate) const STAGING_DIR_NAME: &str = "staging";

/// Durable state accessors over the update store root.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Create a store over the given root directory.
    ///
    /// The directory is not created until something is written.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the status file.
    pub fn status_file_path(&self) -> PathBuf {
        self.root.join(STATUS_FILE_NAME)
    }

    /// Path of the version folder for `label`.
    pub fn package_dir(&self, label: &str) -> PathBuf {
        self.root.join(label)
    }

    /// Path of the metadata file for `label`.
    pub fn package_file_path(&self, label: &str) -> PathBuf {
        self.package_dir(label).join(PACKAGE_FILE_NAME)
    }

    pub(crate) fn download_file_path(&self) -> PathBuf {
        self.root.join(DOWNLOAD_FILE_NAME)
    }

    pub(crate) fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR_NAME)
    }

    /// Read the status record.
    ///
    /// A missing status file is not an error and yields the default record
    /// (no update installed). A file that exists but cannot be parsed is
    /// [`UpdateError::MalformedData`].
    pub fn current_package_info(&self) -> UpdateResult<StatusRecord> {
        let path = self.status_file_path();
        match fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| UpdateError::MalformedData {
                    path,
                    reason: e.to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StatusRecord::default()),
            Err(e) => Err(UpdateError::Read { path, source: e }),
        }
    }

    /// Read the metadata record for `label`.
    ///
    /// An absent metadata file yields `Ok(None)`; a present but unparsable
    /// one is [`UpdateError::MalformedData`].
    pub fn package(&self, label: &str) -> UpdateResult<Option<PackageRecord>> {
        let path = self.package_file_path(label);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| UpdateError::MalformedData {
                    path,
                    reason: e.to_string(),
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpdateError::Read { path, source: e }),
        }
    }

    /// Resolve the current label through [`PackageStore::package`].
    ///
    /// `Ok(None)` when no update is installed. A current label whose record
    /// no longer exists is a dangling pointer and reported as
    /// [`UpdateError::MalformedData`] so the boundary can decide to reset.
    pub fn current_package(&self) -> UpdateResult<Option<PackageRecord>> {
        let Some(label) = self.current_package_info()?.current_label else {
            return Ok(None);
        };
        match self.package(&label)? {
            Some(record) => Ok(Some(record)),
            None => Err(UpdateError::MalformedData {
                path: self.package_file_path(&label),
                reason: format!("status names label \"{label}\" but no package record exists"),
            }),
        }
    }

    /// Path of the current version folder, if a version is installed.
    ///
    /// Pure path resolution; the folder's existence is not checked.
    pub fn current_package_dir(&self) -> UpdateResult<Option<PathBuf>> {
        Ok(self
            .current_package_info()?
            .current_label
            .map(|label| self.package_dir(&label)))
    }

    /// Path of the bundle file the host should load, if an update is
    /// installed.
    ///
    /// Joins the current version folder with the record's relative bundle
    /// path, defaulting to `bundle_file_name` when the record carries none
    /// (raw payloads).
    pub fn current_bundle_path(&self, bundle_file_name: &str) -> UpdateResult<Option<PathBuf>> {
        let Some(record) = self.current_package()? else {
            return Ok(None);
        };
        let dir = self.package_dir(&record.label);
        let relative = record
            .relative_bundle_path
            .unwrap_or_else(|| bundle_file_name.to_string());
        Ok(Some(dir.join(relative)))
    }

    /// Overwrite the status file.
    ///
    /// The write is a plain overwrite, not temp-and-rename: a crash
    /// mid-write can leave a truncated file, which later reads surface as
    /// [`UpdateError::MalformedData`].
    pub fn write_status(&self, status: &StatusRecord) -> UpdateResult<()> {
        let path = self.status_file_path();
        write_json(&path, status)
    }

    /// Overwrite the metadata file for the record's label.
    ///
    /// Same durability caveat as [`PackageStore::write_status`].
    pub fn write_package(&self, record: &PackageRecord) -> UpdateResult<()> {
        let path = self.package_file_path(&record.label);
        write_json(&path, record)
    }

    /// Point the store at `label`.
    ///
    /// A no-op (not an error) when `label` is already current.
    pub fn install(&self, label: &str) -> UpdateResult<()> {
        let mut info = self.current_package_info()?;
        if info.current_label.as_deref() == Some(label) {
            debug!(label, "label already current, skipping install");
            return Ok(());
        }

        info.current_label = Some(label.to_string());
        self.write_status(&info)?;
        info!(label, "installed update");
        Ok(())
    }

    /// Delete the entire store root: all version folders, the status file,
    /// and any transient staging state. A missing root is Ok.
    pub fn clear_all(&self) -> UpdateResult<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| UpdateError::Write {
                path: self.root.clone(),
                source: e,
            })?;
            info!(root = %self.root.display(), "cleared update store");
        }
        Ok(())
    }
}

/// Serialize `value` as pretty JSON and overwrite `path`, creating parent
/// directories as needed.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> UpdateResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_vec_pretty(value).map_err(|e| UpdateError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    fs::write(path, json).map_err(|e| UpdateError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, PackageStore) {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path().join("store"));
        (temp, store)
    }

    fn record(label: &str) -> PackageRecord {
        PackageRecord::new(label, format!("https://example.com/{label}"))
    }

    #[test]
    fn test_missing_status_file_yields_default() {
        let (_temp, store) = store();

        let info = store.current_package_info().unwrap();
        assert_eq!(info, StatusRecord::default());
    }

    #[test]
    fn test_status_round_trip() {
        let (_temp, store) = store();
        let status = StatusRecord::with_label("5");

        store.write_status(&status).unwrap();
        assert_eq!(store.current_package_info().unwrap(), status);
    }

    #[test]
    fn test_malformed_status_file() {
        let (_temp, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.status_file_path(), "not json {{{").unwrap();

        let err = store.current_package_info().unwrap_err();
        assert!(matches!(err, UpdateError::MalformedData { .. }));
    }

    #[test]
    fn test_package_round_trip() {
        let (_temp, store) = store();
        let mut rec = record("3");
        rec.relative_bundle_path = Some("dist/index.bundle".to_string());

        store.write_package(&rec).unwrap();
        assert_eq!(store.package("3").unwrap(), Some(rec));
    }

    #[test]
    fn test_absent_package_is_not_found() {
        let (_temp, store) = store();
        assert_eq!(store.package("99").unwrap(), None);
    }

    #[test]
    fn test_malformed_package_file() {
        let (_temp, store) = store();
        fs::create_dir_all(store.package_dir("3")).unwrap();
        fs::write(store.package_file_path("3"), "[1,2,3]").unwrap();

        let err = store.package("3").unwrap_err();
        assert!(matches!(err, UpdateError::MalformedData { .. }));
    }

    #[test]
    fn test_install_sets_current_package() {
        let (_temp, store) = store();
        store.write_package(&record("7")).unwrap();

        store.install("7").unwrap();

        let current = store.current_package().unwrap().unwrap();
        assert_eq!(current.label, "7");
    }

    #[test]
    fn test_install_is_idempotent() {
        let (_temp, store) = store();
        store.write_package(&record("7")).unwrap();

        store.install("7").unwrap();
        let first = fs::read(store.status_file_path()).unwrap();

        store.install("7").unwrap();
        let second = fs::read(store.status_file_path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_current_package_without_install() {
        let (_temp, store) = store();
        assert_eq!(store.current_package().unwrap(), None);
        assert_eq!(store.current_package_dir().unwrap(), None);
    }

    #[test]
    fn test_dangling_current_label_is_malformed_data() {
        let (_temp, store) = store();
        store.write_status(&StatusRecord::with_label("42")).unwrap();

        let err = store.current_package().unwrap_err();
        assert!(matches!(err, UpdateError::MalformedData { .. }));
    }

    #[test]
    fn test_current_bundle_path_uses_relative_path() {
        let (_temp, store) = store();
        let mut rec = record("3");
        rec.relative_bundle_path = Some("dist/index.bundle".to_string());
        store.write_package(&rec).unwrap();
        store.install("3").unwrap();

        let path = store.current_bundle_path("index.bundle").unwrap().unwrap();
        assert_eq!(path, store.package_dir("3").join("dist/index.bundle"));
    }

    #[test]
    fn test_current_bundle_path_defaults_to_bundle_name() {
        let (_temp, store) = store();
        store.write_package(&record("3")).unwrap();
        store.install("3").unwrap();

        let path = store.current_bundle_path("index.bundle").unwrap().unwrap();
        assert_eq!(path, store.package_dir("3").join("index.bundle"));
    }

    #[test]
    fn test_current_bundle_path_without_install() {
        let (_temp, store) = store();
        assert_eq!(store.current_bundle_path("index.bundle").unwrap(), None);
    }

    #[test]
    fn test_clear_all_resets_store() {
        let (_temp, store) = store();
        store.write_package(&record("3")).unwrap();
        store.install("3").unwrap();

        store.clear_all().unwrap();

        assert!(!store.root().exists());
        assert_eq!(store.current_package_info().unwrap(), StatusRecord::default());
        assert_eq!(store.current_package().unwrap(), None);
    }

    #[test]
    fn test_clear_all_on_missing_root_is_ok() {
        let (_temp, store) = store();
        store.clear_all().unwrap();
    }
}
