//! neurofetch - Resilient installer for neuroimaging model weights and data
//!
//! This library downloads named resources (pretrained network weights,
//! template images, model archives) into a local directory. Each download is
//! retried with backoff, staged next to its target and renamed into place,
//! so an interrupted run never leaves a partial file behind. Archives are
//! CRC-checked member by member before anything is extracted.
//!
//! # Modules
//!
//! - [`fetch`]: single-resource download with retries and atomic placement
//! - [`archive`]: zip validation and extraction
//! - [`catalog`]: resource descriptors, built-in catalog, name lists
//! - [`batch`]: sequential processing of a selection with a per-item report
//! - [`config`]: INI config file and resolved run settings
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: the library error type

pub mod archive;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;

pub use error::{FetchError, FetchResult};
