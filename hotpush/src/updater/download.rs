//! HTTP download of update payloads.
//!
//! The [`Downloader`] streams a payload to disk in fixed-size chunks,
//! reporting progress after every chunk and classifying the payload from its
//! first four bytes: a ZIP local-file-header signature marks an archive,
//! anything else a single raw bundle file. The transfer is requested with
//! identity encoding so the declared content length matches the bytes on the
//! wire, and a mismatch between the two fails the download.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use super::error::{UpdateError, UpdateResult};

/// Chunk size for reading and writing during downloads (256 KiB).
pub const DOWNLOAD_BUFFER_SIZE: usize = 256 * 1024;

/// ZIP local-file-header signature, big-endian (`PK\x03\x04`).
const ZIP_SIGNATURE: u32 = 0x504B_0304;

/// Progress callback invoked after every received chunk.
pub type ProgressCallback = Box<dyn Fn(DownloadProgress) + Send + Sync>;

/// Transient snapshot of an in-flight download. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Declared total size in bytes; equals `received_bytes` on the
    /// terminal callback when the server declared no length.
    pub total_bytes: u64,

    /// Bytes received so far.
    pub received_bytes: u64,
}

impl DownloadProgress {
    /// Whether the download has finished.
    pub fn is_completed(&self) -> bool {
        self.total_bytes == self.received_bytes
    }
}

/// How a downloaded payload should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A ZIP archive to be staged and merged.
    Archive,
    /// A single raw bundle file.
    Raw,
}

/// A payload written to the staging file, ready to be applied.
///
/// The caller owns the file at `path` and deletes it once applied.
#[derive(Debug)]
pub struct DownloadedPayload {
    /// Location of the raw payload on disk.
    pub path: PathBuf,
    /// Archive or raw bundle, from the payload's signature bytes.
    pub kind: PayloadKind,
    /// Total bytes received.
    pub received_bytes: u64,
}

/// Blocking HTTP payload downloader.
#[derive(Debug)]
pub struct Downloader {
    client: Client,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(300))
    }
}

impl Downloader {
    /// Create a downloader with the given request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Download the payload at `url` into `dest`.
    ///
    /// Progress is reported after every chunk, plus one terminal callback
    /// that always reads as completed. Fails with
    /// [`UpdateError::MalformedUrl`] before any I/O if the URL does not
    /// parse, and with [`UpdateError::Integrity`] when the transfer ends
    /// short of (or past) the declared content length.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<&ProgressCallback>,
    ) -> UpdateResult<DownloadedPayload> {
        let parsed = reqwest::Url::parse(url).map_err(|_| UpdateError::MalformedUrl {
            url: url.to_string(),
        })?;

        debug!(url, dest = %dest.display(), "starting download");

        let mut response = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT_ENCODING, "identity")
            .send()
            .map_err(|e| UpdateError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Http {
                url: url.to_string(),
                reason: format!("GET request failed with status {status}"),
            });
        }

        let declared = response.content_length();

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(dest).map_err(|e| UpdateError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; DOWNLOAD_BUFFER_SIZE];
        let mut signature = [0u8; 4];
        let mut received: u64 = 0;

        loop {
            let bytes_read = match response.read(&mut buffer) {
                Ok(n) => n,
                // A connection severed mid-body is a short transfer, not a
                // transport fault.
                Err(e) => match declared {
                    Some(expected) if received < expected => {
                        return Err(UpdateError::Integrity { expected, received });
                    }
                    _ => {
                        return Err(UpdateError::Http {
                            url: url.to_string(),
                            reason: format!("read error: {e}"),
                        });
                    }
                },
            };

            if bytes_read == 0 {
                break;
            }

            if received < 4 {
                for (i, byte) in buffer[..bytes_read].iter().enumerate() {
                    let offset = received as usize + i;
                    if offset >= 4 {
                        break;
                    }
                    signature[offset] = *byte;
                }
            }

            received += bytes_read as u64;
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| UpdateError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            if let Some(cb) = on_progress {
                cb(DownloadProgress {
                    total_bytes: declared.unwrap_or(0),
                    received_bytes: received,
                });
            }
        }

        writer.flush().map_err(|e| UpdateError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if let Some(expected) = declared {
            if expected != received {
                return Err(UpdateError::Integrity { expected, received });
            }
        }

        // Terminal callback: always completed, even when the server
        // declared no length or the body was empty.
        if let Some(cb) = on_progress {
            cb(DownloadProgress {
                total_bytes: received,
                received_bytes: received,
            });
        }

        let kind = classify_payload(&signature, received);
        info!(url, bytes = received, ?kind, "download complete");

        Ok(DownloadedPayload {
            path: dest.to_path_buf(),
            kind,
            received_bytes: received,
        })
    }
}

/// Classify a payload from its first four bytes.
fn classify_payload(signature: &[u8; 4], received: u64) -> PayloadKind {
    if received >= 4 && u32::from_be_bytes(*signature) == ZIP_SIGNATURE {
        PayloadKind::Archive
    } else {
        PayloadKind::Raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_url_fails_before_io() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("payload.bin");

        let downloader = Downloader::default();
        let err = downloader.download("not a url", &dest, None).unwrap_err();

        assert!(matches!(err, UpdateError::MalformedUrl { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_classify_zip_signature() {
        assert_eq!(
            classify_payload(&[0x50, 0x4B, 0x03, 0x04], 100),
            PayloadKind::Archive
        );
    }

    #[test]
    fn test_classify_non_zip_payload() {
        assert_eq!(classify_payload(&[b'v', b'a', b'r', b' '], 100), PayloadKind::Raw);
    }

    #[test]
    fn test_classify_short_payload_is_raw() {
        // Fewer than 4 bytes received: the signature buffer is only
        // partially filled and must not match.
        assert_eq!(classify_payload(&[0x50, 0x4B, 0, 0], 2), PayloadKind::Raw);
    }

    #[test]
    fn test_progress_is_completed() {
        let in_flight = DownloadProgress {
            total_bytes: 1000,
            received_bytes: 400,
        };
        let done = DownloadProgress {
            total_bytes: 1000,
            received_bytes: 1000,
        };

        assert!(!in_flight.is_completed());
        assert!(done.is_completed());
    }
}
