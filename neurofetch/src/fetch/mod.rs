//! Resilient download of single remote resources.
//!
//! This module provides:
//! - Fetch request/outcome types (`request`)
//! - Backoff policies between attempts (`backoff`)
//! - Streaming SHA-256 verification (`checksum`)
//! - The HTTP transport seam and its reqwest implementation (`http`)
//! - The retrying, atomically-placing fetcher (`fetcher`)
//!
//! # Architecture
//!
//! ```text
//! ResilientFetcher
//!         │
//!         ├── HttpClient (trait)
//!         │       └── ReqwestClient
//!         │
//!         ├── Backoff (delay between attempts)
//!         │
//!         └── NamedTempFile staging ──rename──► target
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use neurofetch::fetch::{Backoff, FetchRequest, ResilientFetcher};
//!
//! let fetcher = ResilientFetcher::new(Backoff::linear(Duration::from_secs(5)))?;
//! let request = FetchRequest::new("https://example.org/a.zip", "/tmp/a.zip", 3, 30)?;
//! println!("{}", fetcher.fetch(&request));
//! ```

mod backoff;
mod checksum;
mod fetcher;
pub mod http;
mod request;

pub use backoff::{Backoff, DEFAULT_BACKOFF_BASE_SECS};
pub use fetcher::{ProgressCallback, ResilientFetcher};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use request::{FetchOutcome, FetchRequest, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
