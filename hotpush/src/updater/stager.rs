//! Archive staging for update payloads.
//!
//! Archive payloads are extracted into a staging directory disjoint from any
//! version folder, so a failed or partial extraction never touches installed
//! state. A diff payload announces itself with a deletion manifest at the
//! staged tree root; the manifest is parsed and consumed here.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::{debug, info};
use zip::ZipArchive;

use crate::package::DiffManifest;

use super::error::{UpdateError, UpdateResult};

/// Name of the deletion manifest inside a staged diff payload.
pub const DIFF_MANIFEST_FILE_NAME: &str = "diff-manifest.json";

/// Result of staging an archive payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpdate {
    /// Whether the payload is an incremental update against the current
    /// version.
    pub is_diff: bool,

    /// Files to delete from the base version. Empty for full updates.
    pub deleted_files: Vec<String>,
}

/// Extracts archive payloads into a staging directory.
#[derive(Debug, Default)]
pub struct ArchiveStager;

impl ArchiveStager {
    /// Create a new stager.
    pub fn new() -> Self {
        Self
    }

    /// Extract `archive` into `staging_dir` and detect the update kind.
    ///
    /// When the staged tree carries a deletion manifest at its root, the
    /// manifest is parsed, removed from the staged tree, and its file list
    /// returned with `is_diff = true`.
    pub fn stage(&self, archive: &Path, staging_dir: &Path) -> UpdateResult<StagedUpdate> {
        extract_zip(archive, staging_dir)?;

        let manifest_path = staging_dir.join(DIFF_MANIFEST_FILE_NAME);
        if !manifest_path.exists() {
            debug!(staging = %staging_dir.display(), "staged full update");
            return Ok(StagedUpdate {
                is_diff: false,
                deleted_files: Vec::new(),
            });
        }

        let text = fs::read_to_string(&manifest_path).map_err(|e| UpdateError::Read {
            path: manifest_path.clone(),
            source: e,
        })?;
        let manifest: DiffManifest =
            serde_json::from_str(&text).map_err(|e| UpdateError::MalformedData {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;

        // Consumed: the manifest must not land in the version folder.
        fs::remove_file(&manifest_path).map_err(|e| UpdateError::Write {
            path: manifest_path,
            source: e,
        })?;

        info!(
            deletions = manifest.deleted_files.len(),
            "staged diff update"
        );
        Ok(StagedUpdate {
            is_diff: true,
            deleted_files: manifest.deleted_files,
        })
    }
}

/// Extract a ZIP archive into `dest_dir`.
///
/// Entries whose names escape the destination (absolute paths, `..`) are
/// skipped.
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> UpdateResult<()> {
    fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDir {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let file = File::open(archive_path).map_err(|e| UpdateError::Read {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| UpdateError::Extraction {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| UpdateError::Extraction {
            path: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let out_path = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => continue,
        };

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| UpdateError::CreateDir {
                path: out_path.clone(),
                source: e,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut out_file = File::create(&out_path).map_err(|e| UpdateError::Write {
            path: out_path.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out_file).map_err(|e| UpdateError::Write {
            path: out_path.clone(),
            source: e,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        for (name, contents) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }

        writer.finish().unwrap();
    }

    #[test]
    fn test_stage_full_update() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("payload.zip");
        write_zip(
            &archive,
            &[("index.bundle", b"bundle"), ("assets/logo.png", b"png")],
        );

        let staging = temp.path().join("staging");
        let staged = ArchiveStager::new().stage(&archive, &staging).unwrap();

        assert!(!staged.is_diff);
        assert!(staged.deleted_files.is_empty());
        assert_eq!(fs::read(staging.join("index.bundle")).unwrap(), b"bundle");
        assert_eq!(fs::read(staging.join("assets/logo.png")).unwrap(), b"png");
    }

    #[test]
    fn test_stage_diff_update_consumes_manifest() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("payload.zip");
        write_zip(
            &archive,
            &[
                ("diff-manifest.json", br#"{"deletedFiles":["b.txt"]}"#),
                ("c.txt", b"c prime"),
            ],
        );

        let staging = temp.path().join("staging");
        let staged = ArchiveStager::new().stage(&archive, &staging).unwrap();

        assert!(staged.is_diff);
        assert_eq!(staged.deleted_files, vec!["b.txt"]);
        assert!(!staging.join(DIFF_MANIFEST_FILE_NAME).exists());
        assert!(staging.join("c.txt").exists());
    }

    #[test]
    fn test_stage_malformed_manifest() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("payload.zip");
        write_zip(&archive, &[("diff-manifest.json", b"not json")]);

        let staging = temp.path().join("staging");
        let err = ArchiveStager::new().stage(&archive, &staging).unwrap_err();

        assert!(matches!(err, UpdateError::MalformedData { .. }));
    }

    #[test]
    fn test_stage_non_archive_fails_extraction() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("payload.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let staging = temp.path().join("staging");
        let err = ArchiveStager::new().stage(&archive, &staging).unwrap_err();

        assert!(matches!(err, UpdateError::Extraction { .. }));
    }
}
