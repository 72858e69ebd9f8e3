//! Reconciliation of staged updates against the installed version.
//!
//! Diffing is whole-file and manifest-driven: a diff payload ships only the
//! files that changed plus a list of files to delete. Merging layers the
//! current version underneath, applies the deletions, and copies the staged
//! contents on top. Full updates skip the base layer entirely.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::error::{UpdateError, UpdateResult};

/// Merge a staged update into `dest_dir`.
///
/// With a `base_dir` (diff update): the base folder's contents are copied
/// into `dest_dir` first, each `deleted_files` path is removed (absence is
/// not an error), and the staged contents are copied over the result, with
/// staged files winning on collisions. A base that does not exist on disk
/// is treated as absent.
///
/// Without a base (full update): the staged contents are copied into a
/// fresh `dest_dir`, leaving no residue from any prior version.
pub fn merge(
    base_dir: Option<&Path>,
    staging_dir: &Path,
    deleted_files: &[String],
    dest_dir: &Path,
) -> UpdateResult<()> {
    fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDir {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    if let Some(base) = base_dir {
        if base.is_dir() {
            debug!(base = %base.display(), "copying base version");
            copy_directory_contents(base, dest_dir)?;
        }

        for relative in deleted_files {
            let target = dest_dir.join(relative);
            if target.is_dir() {
                fs::remove_dir_all(&target).map_err(|e| UpdateError::Write {
                    path: target.clone(),
                    source: e,
                })?;
            } else if target.exists() {
                fs::remove_file(&target).map_err(|e| UpdateError::Write {
                    path: target.clone(),
                    source: e,
                })?;
            }
        }
    }

    copy_directory_contents(staging_dir, dest_dir)
}

/// Recursively copy the contents of `source` into `dest`, overwriting
/// same-path files.
pub fn copy_directory_contents(source: &Path, dest: &Path) -> UpdateResult<()> {
    fs::create_dir_all(dest).map_err(|e| UpdateError::CreateDir {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let entries = fs::read_dir(source).map_err(|e| UpdateError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| UpdateError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_directory_contents(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| UpdateError::Write {
                path: dest_path,
                source: e,
            })?;
        }
    }

    Ok(())
}

/// Find the first file named `bundle_file_name` under `dir`, returning its
/// path relative to `dir` with `/` separators.
///
/// Directory iteration order is platform-dependent; when a payload contains
/// several files with the expected name, whichever is encountered first
/// wins.
pub fn find_bundle(dir: &Path, bundle_file_name: &str) -> UpdateResult<Option<String>> {
    let entries = fs::read_dir(dir).map_err(|e| UpdateError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| UpdateError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            if let Some(nested) = find_bundle(&path, bundle_file_name)? {
                return Ok(Some(format!("{name}/{nested}")));
            }
        } else if name == bundle_file_name {
            return Ok(Some(name));
        }
    }

    Ok(None)
}
