//! Error types for update operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while downloading, applying, or reading updates.
///
/// None of these are fatal to the process. The status pointer only ever
/// advances to a label whose record was fully written, so every failure
/// leaves the store in a loadable state. Recovery from [`MalformedData`]
/// (wipe the store and fall back to binary content) is the calling
/// boundary's decision; the store itself only reports the condition.
///
/// [`MalformedData`]: UpdateError::MalformedData
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The download URL is not well-formed. Raised before any network I/O.
    #[error("malformed download URL: {url}")]
    MalformedUrl { url: String },

    /// The HTTP request failed or returned a non-success status.
    #[error("download from {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Received byte count does not match the declared content length.
    #[error("received {received} bytes, expected {expected}")]
    Integrity { expected: u64, received: u64 },

    /// A persisted record exists but cannot be parsed, or the status
    /// pointer names a version that no longer resolves.
    #[error("malformed update state at {}: {reason}", .path.display())]
    MalformedData { path: PathBuf, reason: String },

    /// The downloaded contents have no file with the expected bundle name.
    #[error(
        "update is invalid: no bundle file named \"{bundle_file_name}\" in the downloaded contents"
    )]
    InvalidUpdate { bundle_file_name: String },

    /// Archive extraction failed.
    #[error("failed to extract {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
