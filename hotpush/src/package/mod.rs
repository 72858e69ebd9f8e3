//! Update package types.
//!
//! This module provides the pure data types of the update system:
//!
//! - **PackageRecord**: per-version metadata persisted in the version folder
//! - **StatusRecord**: the single pointer to the current version
//! - **DiffManifest**: deletion list carried by incremental updates
//! - **AppVersion**: lenient semver-backed binary version comparison
//!
//! Operations over these types live in [`crate::updater`].

mod record;
mod version;

pub use record::{DiffManifest, PackageRecord, StatusRecord};
pub use version::{AppVersion, InvalidAppVersion};
