//! Update installation workflow.
//!
//! [`UpdateInstaller`] orchestrates the full download path:
//!
//! 1. Capture the current version folder as the diff base
//! 2. Remove stale residue of the target version folder
//! 3. Download the payload, classifying archive vs. raw bundle
//! 4. Archive: stage, merge (diff or full), locate the bundle file
//! 5. Raw: move the payload in under the expected bundle name
//! 6. Write the version metadata last and return it
//!
//! Installing (flipping the current-version pointer) is a separate,
//! deliberately tiny step so the host can download in the background and
//! activate on its own schedule.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::package::{AppVersion, PackageRecord};

use super::config::UpdaterConfig;
use super::download::{DownloadedPayload, Downloader, PayloadKind, ProgressCallback};
use super::error::{UpdateError, UpdateResult};
use super::merge::{find_bundle, merge};
use super::stager::ArchiveStager;
use super::store::PackageStore;

/// Caller-supplied description of a remote update to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDescriptor {
    /// Label for the new version; becomes its folder name.
    pub label: String,

    /// URL of the update payload.
    pub download_url: String,

    /// Binary application version the update targets.
    pub app_version: Option<String>,

    /// Modification time of the binary the update was built against.
    pub binary_modified_time: Option<String>,

    /// Publisher-supplied content hash.
    pub package_hash: Option<String>,
}

impl UpdateDescriptor {
    /// Create a descriptor with the required fields.
    pub fn new(label: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            download_url: download_url.into(),
            app_version: None,
            binary_modified_time: None,
            package_hash: None,
        }
    }

    /// Set the targeted binary application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Set the binary modification time.
    pub fn with_binary_modified_time(mut self, time: impl Into<String>) -> Self {
        self.binary_modified_time = Some(time.into());
        self
    }

    /// Set the publisher content hash.
    pub fn with_package_hash(mut self, hash: impl Into<String>) -> Self {
        self.package_hash = Some(hash.into());
        self
    }
}

/// Orchestrates downloading and installing updates over a [`PackageStore`].
///
/// Constructed explicitly with its configuration; holds no process-wide
/// state. Operations are blocking and must be serialized by the caller.
pub struct UpdateInstaller {
    store: PackageStore,
    downloader: Downloader,
    config: UpdaterConfig,
}

impl UpdateInstaller {
    /// Create an installer from configuration.
    pub fn new(config: UpdaterConfig) -> Self {
        let store = PackageStore::new(&config.root_dir);
        let downloader = Downloader::with_timeout(config.timeout);
        Self {
            store,
            downloader,
            config,
        }
    }

    /// The underlying package store.
    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Download the update named by `descriptor` into a new version folder.
    ///
    /// On success the version's metadata record is written (last, after all
    /// content validation) and returned. On any failure no record is
    /// written and the partially built version folder is removed, so the
    /// store never exposes a half-installed version. Does not touch the
    /// current-version pointer; see [`UpdateInstaller::install_update`].
    pub fn download_update(
        &self,
        descriptor: &UpdateDescriptor,
        on_progress: Option<ProgressCallback>,
    ) -> UpdateResult<PackageRecord> {
        self.warn_on_binary_mismatch(descriptor);

        // The diff base is the version installed right now; resolve it
        // before anything below mutates the store.
        let base_dir = self.store.current_package_dir()?;

        let dest_dir = self.store.package_dir(&descriptor.label);
        if dest_dir.exists() {
            // Residue from a crashed or failed earlier attempt at this
            // same label.
            fs::remove_dir_all(&dest_dir).map_err(|e| UpdateError::Write {
                path: dest_dir.clone(),
                source: e,
            })?;
        }

        let download_path = self.store.download_file_path();
        let payload =
            self.downloader
                .download(&descriptor.download_url, &download_path, on_progress.as_ref())?;

        let result = self.apply_payload(&payload, base_dir.as_deref(), &dest_dir, descriptor);

        let _ = fs::remove_file(&download_path);
        match result {
            Ok(record) => Ok(record),
            Err(e) => {
                let _ = fs::remove_dir_all(&dest_dir);
                Err(e)
            }
        }
    }

    /// Make `label` the current version.
    ///
    /// A no-op when `label` is already current.
    pub fn install_update(&self, label: &str) -> UpdateResult<()> {
        self.store.install(label)
    }

    fn apply_payload(
        &self,
        payload: &DownloadedPayload,
        base_dir: Option<&Path>,
        dest_dir: &Path,
        descriptor: &UpdateDescriptor,
    ) -> UpdateResult<PackageRecord> {
        let bundle_file_name = &self.config.bundle_file_name;

        let relative_bundle_path = match payload.kind {
            PayloadKind::Archive => {
                let staging_dir = self.store.staging_dir();
                if staging_dir.exists() {
                    fs::remove_dir_all(&staging_dir).map_err(|e| UpdateError::Write {
                        path: staging_dir.clone(),
                        source: e,
                    })?;
                }

                let staged = ArchiveStager::new().stage(&payload.path, &staging_dir)?;
                if staged.is_diff {
                    info!(label = %descriptor.label, "applying diff update");
                } else {
                    info!(label = %descriptor.label, "applying full update");
                }

                let base = if staged.is_diff { base_dir } else { None };
                let merged = merge(base, &staging_dir, &staged.deleted_files, dest_dir);
                let _ = fs::remove_dir_all(&staging_dir);
                merged?;

                match find_bundle(dest_dir, bundle_file_name)? {
                    Some(relative) => Some(relative),
                    None => {
                        return Err(UpdateError::InvalidUpdate {
                            bundle_file_name: bundle_file_name.clone(),
                        })
                    }
                }
            }
            PayloadKind::Raw => {
                info!(label = %descriptor.label, "applying raw bundle update");
                fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDir {
                    path: dest_dir.to_path_buf(),
                    source: e,
                })?;

                let bundle_dest = dest_dir.join(bundle_file_name);
                move_file(&payload.path, &bundle_dest)?;
                // The bundle sits directly under the version folder; path
                // resolution falls back to the configured name.
                None
            }
        };

        let record = PackageRecord {
            label: descriptor.label.clone(),
            download_url: descriptor.download_url.clone(),
            relative_bundle_path,
            app_version: descriptor.app_version.clone(),
            binary_modified_time: descriptor.binary_modified_time.clone(),
            package_hash: descriptor.package_hash.clone(),
        };
        self.store.write_package(&record)?;

        Ok(record)
    }

    fn warn_on_binary_mismatch(&self, descriptor: &UpdateDescriptor) {
        let (Some(binary), Some(target)) =
            (&self.config.binary_app_version, &descriptor.app_version)
        else {
            return;
        };

        match target.parse::<AppVersion>() {
            Ok(ref version) if version.matches(binary) => {}
            Ok(version) => warn!(
                binary = %binary,
                targeted = %version,
                "update targets a different binary version"
            ),
            Err(_) => warn!(
                targeted = %target,
                "update has an unparsable target app version"
            ),
        }
    }
}

/// Move a file, falling back to copy-and-delete across filesystems.
fn move_file(source: &Path, dest: &Path) -> UpdateResult<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    fs::copy(source, dest).map_err(|e| UpdateError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;
    fs::remove_file(source).map_err(|e| UpdateError::Write {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
