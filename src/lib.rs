//! # Fetch Cache
//!
//! A disk-backed cache for remotely fetched binary resources. Given a URI,
//! [`FetchCache::resolve`] returns the path of a local file containing that
//! resource, downloading it at most once no matter how many callers ask
//! concurrently and reusing any previously fetched copy afterwards.
//!
//! ## Features
//!
//! - Single-flight downloads: concurrent requests for one URI share a fetch
//! - Content-addressed storage: files are named by a SHA-1 digest of the URI
//! - Crash-safe publication: download to a temp path, then atomic rename
//! - Progress fan-out to every subscriber of an in-flight fetch
//! - Pluggable transfer and digest providers for testing

pub mod cache;
pub mod config;
pub mod digest;
mod entry;
pub mod error;
pub mod progress;
pub mod store;

pub use cache::{CacheBuilder, DEFAULT_DIR_NAME, FetchCache};
pub use config::DownloadConfig;
pub use digest::{DigestKeyer, Sha1Keyer};
pub use error::{CacheError, TransferError};
pub use progress::{OnProgress, Progress};
pub use store::{FileStore, HttpFileStore, create_client};
