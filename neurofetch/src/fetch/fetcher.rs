//! Retrying downloader with temp-file staging and atomic placement.
//!
//! A download is streamed into `.<name>.XXXXXX.part` next to the target and
//! renamed onto the target only after the body is complete (and, when
//! requested, its SHA-256 matches). The target therefore either does not
//! exist or holds a complete file.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::thread;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::checksum::{verify_digest, HashingWriter};
use super::http::{HttpClient, ReqwestClient};
use super::request::{FetchOutcome, FetchRequest};
use crate::error::{FetchError, FetchResult};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Progress callback: `(bytes_so_far, total_if_known)`.
pub type ProgressCallback<'a> = dyn Fn(u64, Option<u64>) + Send + Sync + 'a;

/// Downloader with bounded retries and crash-safe placement.
#[derive(Debug)]
pub struct ResilientFetcher<C = ReqwestClient> {
    client: C,
    backoff: Backoff,
}

impl ResilientFetcher<ReqwestClient> {
    /// Create a fetcher backed by the real HTTP client.
    pub fn new(backoff: Backoff) -> FetchResult<Self> {
        Ok(Self::with_client(ReqwestClient::new()?, backoff))
    }
}

impl<C: HttpClient> ResilientFetcher<C> {
    /// Create a fetcher with a custom HTTP client.
    pub fn with_client(client: C, backoff: Backoff) -> Self {
        Self { client, backoff }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Ensure `request.target_path()` exists, downloading it if needed.
    pub fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.fetch_with_progress(request, None)
    }

    /// Like [`fetch`](Self::fetch), reporting streamed bytes to `progress`.
    pub fn fetch_with_progress(
        &self,
        request: &FetchRequest,
        progress: Option<&ProgressCallback<'_>>,
    ) -> FetchOutcome {
        let target = request.target_path();
        if target.exists() {
            debug!(target = %target.display(), "Target already present, skipping download");
            return FetchOutcome::AlreadyPresent;
        }

        let max_attempts = request.max_retries();
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(request, progress) {
                Ok(bytes) => {
                    info!(
                        url = %request.url(),
                        target = %target.display(),
                        bytes,
                        attempt,
                        "Download complete"
                    );
                    return FetchOutcome::Success { bytes };
                }
                Err(e) => {
                    warn!(
                        url = %request.url(),
                        attempt,
                        max_attempts,
                        transient = e.is_transient(),
                        error = %e,
                        "Download attempt failed"
                    );
                    last_error = Some(e);

                    if attempt < max_attempts {
                        let delay = self.backoff.delay_for_attempt(attempt);
                        if !delay.is_zero() {
                            debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                            thread::sleep(delay);
                        }
                    }
                }
            }
        }

        FetchOutcome::Failed {
            reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
            attempts: max_attempts,
        }
    }

    /// One download attempt. The staging file is removed on every error path
    /// when the `NamedTempFile` is dropped.
    fn attempt(
        &self,
        request: &FetchRequest,
        progress: Option<&ProgressCallback<'_>>,
    ) -> FetchResult<u64> {
        let target = request.target_path();
        let staged = create_staging_file(target)?;
        debug!(staging = %staged.path().display(), "Staging download");

        let response = self.client.get(request.url(), request.timeout())?;
        let total = response.content_length;

        let mut writer = HashingWriter::new(BufWriter::new(staged));
        stream_body(request, response.body, &mut writer, total, progress)?;

        let written = writer.written();
        let digest = writer.hex_digest();
        let staged = writer
            .into_inner()
            .into_inner()
            .map_err(|e| FetchError::WriteFailed {
                path: target.to_path_buf(),
                source: e.into_error(),
            })?;

        if let Some(expected) = total {
            if written != expected {
                return Err(FetchError::Truncated {
                    url: request.url().to_string(),
                    expected,
                    actual: written,
                });
            }
        }

        if let Some(expected) = request.expected_sha256() {
            verify_digest(&file_name_of(target), expected, &digest)?;
        }

        staged
            .as_file()
            .sync_all()
            .map_err(|e| FetchError::WriteFailed {
                path: staged.path().to_path_buf(),
                source: e,
            })?;

        staged.persist(target).map_err(|e| FetchError::PersistFailed {
            path: target.to_path_buf(),
            source: e.error,
        })?;

        Ok(written)
    }
}

/// Create a uniquely named staging file in the target's directory.
///
/// Staging in the same directory keeps the final rename on one filesystem.
fn create_staging_file(target: &Path) -> FetchResult<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir).map_err(|e| FetchError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name_of(target)))
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| FetchError::WriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Copy the response body into the staging writer.
fn stream_body<W: Write>(
    request: &FetchRequest,
    mut body: Box<dyn Read + Send>,
    writer: &mut HashingWriter<W>,
    total: Option<u64>,
    progress: Option<&ProgressCallback<'_>>,
) -> FetchResult<()> {
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(FetchError::Timeout {
                    url: request.url().to_string(),
                    timeout_secs: request.timeout_secs(),
                });
            }
            Err(e) => {
                return Err(FetchError::DownloadFailed {
                    url: request.url().to_string(),
                    reason: format!("read error: {}", e),
                });
            }
        };

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| FetchError::WriteFailed {
                path: request.target_path().to_path_buf(),
                source: e,
            })?;

        if let Some(cb) = progress {
            cb(writer.written(), total);
        }
    }

    writer.flush().map_err(|e| FetchError::WriteFailed {
        path: request.target_path().to_path_buf(),
        source: e,
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string())
}
