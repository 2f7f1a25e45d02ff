//! HTTP client abstraction for testability.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use super::request::DEFAULT_TIMEOUT_SECS;
use crate::error::{FetchError, FetchResult};

/// Upper bound on the connect phase, whatever the idle timeout.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// An open response body ready to be streamed.
pub struct HttpResponse {
    /// Advertised body length, if the server sent one.
    pub content_length: Option<u64>,
    /// Body reader. A silent connection fails with `io::ErrorKind::TimedOut`.
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Trait for HTTP GET operations.
///
/// This abstraction allows the fetcher to be driven by scripted clients in
/// tests instead of a live network.
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and return the response body for streaming.
    ///
    /// `timeout` is the longest the connection may stay silent: while
    /// connecting, while waiting for the response head, and between body
    /// reads. A transfer that keeps delivering bytes is never cut off.
    /// Non-success statuses are errors.
    fn get(&self, url: &str, timeout: Duration) -> FetchResult<HttpResponse>;
}

/// Real HTTP client implementation using blocking reqwest.
///
/// reqwest's blocking client applies its client-level timeout to each wait
/// (sending, then every body read), whereas a per-request timeout would be
/// a deadline for the whole transfer. One client is therefore kept per
/// idle timeout.
#[derive(Debug, Default)]
pub struct ReqwestClient {
    clients: Mutex<HashMap<Duration, Client>>,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient, building the client for the default timeout.
    pub fn new() -> FetchResult<Self> {
        let client = Self::default();
        client.client_for(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
        Ok(client)
    }

    fn client_for(&self, idle_timeout: Duration) -> FetchResult<Client> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| FetchError::ClientBuild("client cache lock poisoned".to_string()))?;

        if let Some(client) = clients.get(&idle_timeout) {
            return Ok(client.clone());
        }

        let client = build_client(idle_timeout)?;
        clients.insert(idle_timeout, client.clone());
        Ok(client)
    }
}

fn build_client(idle_timeout: Duration) -> FetchResult<Client> {
    Client::builder()
        .connect_timeout(idle_timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS)))
        .timeout(idle_timeout)
        .user_agent(concat!("neurofetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> FetchResult<HttpResponse> {
        let response = self.client_for(timeout)?.get(url).send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                FetchError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(HttpResponse {
            content_length: response.content_length(),
            body: Box::new(ResponseBody(response)),
        })
    }
}

/// reqwest reports a timed-out body read as `io::ErrorKind::Other` wrapping
/// its own error; re-kind it so callers can tell a stall from a reset.
struct ResponseBody(Response);

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| {
            if is_timeout(&e) {
                io::Error::new(io::ErrorKind::TimedOut, e)
            } else {
                e
            }
        })
    }
}

fn is_timeout(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::TimedOut
        || error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout)
}
