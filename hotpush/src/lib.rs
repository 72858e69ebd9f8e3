//! Hotpush - over-the-air content updates for packaged applications.
//!
//! This library downloads update payloads, verifies they were received
//! intact, applies them as full replacements or manifest-driven diffs
//! against the installed version, and atomically advances a current-version
//! pointer so the next load picks up the new content. Host-runtime concerns
//! (reloading the running application, UI event dispatch) live outside this
//! crate; the host drives the updater and receives plain data back.
//!
//! # Example
//!
//! ```no_run
//! use hotpush::{UpdateDescriptor, UpdateInstaller, UpdaterConfig};
//!
//! # fn main() -> Result<(), hotpush::UpdateError> {
//! let installer = UpdateInstaller::new(UpdaterConfig::new("/data/updates"));
//!
//! let descriptor = UpdateDescriptor::new("14", "https://updates.example.com/v14.zip");
//! let record = installer.download_update(&descriptor, None)?;
//! installer.install_update(&record.label)?;
//!
//! let bundle_path = installer.store().current_bundle_path("index.bundle")?;
//! assert!(bundle_path.is_some());
//! # Ok(())
//! # }
//! ```

pub mod package;
pub mod updater;

pub use package::{AppVersion, DiffManifest, PackageRecord, StatusRecord};
pub use updater::{
    DownloadProgress, PackageStore, ProgressCallback, UpdateDescriptor, UpdateError,
    UpdateInstaller, UpdateResult, UpdaterConfig,
};
