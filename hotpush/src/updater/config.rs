//! Configuration for the updater.

use std::path::PathBuf;
use std::time::Duration;

use crate::package::AppVersion;

/// Default name of the bundle file the host loads.
pub const DEFAULT_BUNDLE_FILE_NAME: &str = "index.bundle";

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Configuration for the updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Root directory of the update store.
    ///
    /// Holds one folder per downloaded version, the status file, and
    /// transient download/staging state.
    pub root_dir: PathBuf,

    /// File name of the bundle the host loads.
    ///
    /// Must match the name shipped inside update payloads; an archive
    /// payload containing no file with this name is rejected.
    pub bundle_file_name: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Version of the running binary, if known.
    ///
    /// When set, a downloaded update targeting a different binary version
    /// logs a warning. Acting on the mismatch is the caller's policy.
    pub binary_app_version: Option<AppVersion>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            bundle_file_name: DEFAULT_BUNDLE_FILE_NAME.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            binary_app_version: None,
        }
    }
}

impl UpdaterConfig {
    /// Create a configuration with the given store root directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Set the expected bundle file name.
    pub fn with_bundle_file_name(mut self, name: impl Into<String>) -> Self {
        self.bundle_file_name = name.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the running binary's application version.
    pub fn with_binary_app_version(mut self, version: AppVersion) -> Self {
        self.binary_app_version = Some(version);
        self
    }
}
