//! Request and outcome types for a single fetch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// Default number of download attempts per resource.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default idle timeout in seconds: the longest a connection may stay silent.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A remote resource to place at a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: String,
    target_path: PathBuf,
    max_retries: u32,
    timeout_secs: u64,
    expected_sha256: Option<String>,
}

impl FetchRequest {
    /// Create a request with explicit attempt and idle timeout bounds.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRequest`] if `max_retries` or
    /// `timeout_secs` is zero, or the URL is empty.
    pub fn new(
        url: impl Into<String>,
        target_path: impl Into<PathBuf>,
        max_retries: u32,
        timeout_secs: u64,
    ) -> FetchResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(FetchError::InvalidRequest("url must not be empty".to_string()));
        }
        if max_retries == 0 {
            return Err(FetchError::InvalidRequest(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if timeout_secs == 0 {
            return Err(FetchError::InvalidRequest(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            url,
            target_path: target_path.into(),
            max_retries,
            timeout_secs,
            expected_sha256: None,
        })
    }

    /// Require the downloaded bytes to hash to `sha256` (hex, any case).
    pub fn with_expected_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into().to_lowercase());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn expected_sha256(&self) -> Option<&str> {
        self.expected_sha256.as_deref()
    }
}

/// Result of [`ResilientFetcher::fetch`](super::ResilientFetcher::fetch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The resource was downloaded and moved into place.
    Success {
        /// Bytes written to the target.
        bytes: u64,
    },
    /// The target already existed; no network activity happened.
    AlreadyPresent,
    /// Every attempt failed.
    Failed {
        /// Message of the last error.
        reason: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

impl FetchOutcome {
    /// Whether the target exists after this outcome.
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { bytes } => write!(f, "downloaded {} bytes", bytes),
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Failed { reason, attempts } => {
                write!(f, "failed after {} attempt(s): {}", attempts, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_new() {
        let request = FetchRequest::new("https://example/a.zip", "/tmp/a.zip", 3, 30).unwrap();
        assert_eq!(request.url(), "https://example/a.zip");
        assert_eq!(request.target_path(), Path::new("/tmp/a.zip"));
        assert_eq!(request.max_retries(), 3);
        assert_eq!(request.timeout(), Duration::from_secs(30));
        assert_eq!(request.expected_sha256(), None);
    }

    #[test]
    fn test_request_rejects_zero_retries() {
        let result = FetchRequest::new("https://example/a.zip", "/tmp/a.zip", 0, 30);
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }

    #[test]
    fn test_request_rejects_zero_timeout() {
        let result = FetchRequest::new("https://example/a.zip", "/tmp/a.zip", 3, 0);
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }

    #[test]
    fn test_request_rejects_empty_url() {
        let result = FetchRequest::new("  ", "/tmp/a.zip", 3, 30);
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }

    #[test]
    fn test_expected_sha256_is_lowercased() {
        let request = FetchRequest::new("https://example/a.zip", "/tmp/a.zip", 1, 1)
            .unwrap()
            .with_expected_sha256("ABCDEF");
        assert_eq!(request.expected_sha256(), Some("abcdef"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(FetchOutcome::AlreadyPresent.to_string(), "already present");
        let failed = FetchOutcome::Failed {
            reason: "boom".to_string(),
            attempts: 3,
        };
        assert_eq!(failed.to_string(), "failed after 3 attempt(s): boom");
        assert!(!failed.is_available());
        assert!(FetchOutcome::Success { bytes: 1 }.is_available());
    }
}
