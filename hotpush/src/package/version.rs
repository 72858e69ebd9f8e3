//! Binary application version comparison.
//!
//! Update descriptors carry the binary version they target as a dotted
//! string. Publishers emit anything from `"4"` to `"4.34"` to full semantic
//! versions with pre-release qualifiers, so [`AppVersion`] parses leniently:
//! one to three numeric segments are padded with zeros, and anything that
//! parses as full semver is taken as-is. Ordering is semver ordering.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Error returned when an app version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid app version \"{value}\"")]
pub struct InvalidAppVersion {
    /// The rejected input.
    pub value: String,
}

/// A binary application version with lenient dotted parsing.
///
/// # Example
///
/// ```
/// use hotpush::package::AppVersion;
///
/// let short: AppVersion = "4.34".parse().unwrap();
/// let full: AppVersion = "4.34.0".parse().unwrap();
/// let newer: AppVersion = "4.35".parse().unwrap();
///
/// assert_eq!(short, full);
/// assert!(short < newer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AppVersion(Version);

impl AppVersion {
    /// The underlying semantic version.
    pub fn as_semver(&self) -> &Version {
        &self.0
    }

    /// Whether this version names the same release as `other`.
    ///
    /// Build metadata is ignored, matching semver equality.
    pub fn matches(&self, other: &AppVersion) -> bool {
        self.0 == other.0
    }
}

impl FromStr for AppVersion {
    type Err = InvalidAppVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(version) = Version::parse(s) {
            return Ok(Self(version));
        }

        // Short numeric forms like "4" or "4.34": pad to three segments.
        let segments: Vec<&str> = s.split('.').collect();
        if (1..=3).contains(&segments.len()) {
            let parsed: Result<Vec<u64>, _> = segments.iter().map(|p| p.parse::<u64>()).collect();
            if let Ok(numbers) = parsed {
                let major = numbers[0];
                let minor = numbers.get(1).copied().unwrap_or(0);
                let patch = numbers.get(2).copied().unwrap_or(0);
                return Ok(Self(Version::new(major, minor, patch)));
            }
        }

        Err(InvalidAppVersion {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Version> for AppVersion {
    fn from(version: Version) -> Self {
        Self(version)
    }
}
