//! Update download, storage, and installation.
//!
//! This module implements the update pipeline:
//!
//! ```text
//! UpdateInstaller (orchestration)
//!         │
//!         ├── Downloader      streams the payload, classifies archive/raw
//!         ├── ArchiveStager   extracts archives, detects diff manifests
//!         ├── merge           reconciles staged contents with the base
//!         └── PackageStore    durable version folders + status pointer
//! ```
//!
//! All operations are synchronous and blocking; callers run them off any
//! thread that must stay responsive, one operation in flight at a time.
//! The store root is single-writer: no internal locking is performed.

mod config;
mod download;
mod error;
mod installer;
mod merge;
mod stager;
mod store;

pub use config::{UpdaterConfig, DEFAULT_BUNDLE_FILE_NAME};
pub use download::{
    DownloadProgress, DownloadedPayload, Downloader, PayloadKind, ProgressCallback,
    DOWNLOAD_BUFFER_SIZE,
};
pub use error::{UpdateError, UpdateResult};
pub use installer::{UpdateDescriptor, UpdateInstaller};
pub use merge::{copy_directory_contents, find_bundle, merge};
pub use stager::{ArchiveStager, StagedUpdate, DIFF_MANIFEST_FILE_NAME};
pub use store::{PackageStore, PACKAGE_FILE_NAME, STATUS_FILE_NAME};
