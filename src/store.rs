//! # File Store
//!
//! The filesystem and transfer provider consumed by the fetch engine. The
//! [`FileStore`] trait is the seam: the engine only needs directory creation,
//! an existence check, an atomic rename and a download-to-file primitive.
//! [`HttpFileStore`] is the real implementation over reqwest and tokio::fs.

use std::path::Path;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::DownloadConfig;
use crate::error::TransferError;
use crate::progress::Progress;

/// Filesystem and transfer operations needed by a fetch cycle.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Recursively create a directory; succeeds if it already exists.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &Path) -> std::io::Result<bool>;

    /// Atomically move `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Download `uri` into the file at `dest`, reporting progress as bytes
    /// arrive.
    ///
    /// Returns `Ok(Some(status))` when a response was received (the caller
    /// decides what to do with non-200 statuses), `Ok(None)` when the
    /// transfer produced no response at all, and `Err` for any underlying
    /// failure.
    async fn download(
        &self,
        uri: &str,
        dest: &Path,
        config: &DownloadConfig,
        on_progress: &(dyn Fn(Progress) + Send + Sync),
    ) -> Result<Option<u16>, TransferError>;
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloadConfig) -> Result<Client, TransferError> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    builder.build().map_err(TransferError::from)
}

/// [`FileStore`] backed by reqwest streaming downloads and tokio::fs.
pub struct HttpFileStore {
    client: Client,
}

impl HttpFileStore {
    /// Create a store whose client is built from the default config.
    pub fn new() -> Result<Self, TransferError> {
        Self::with_config(&DownloadConfig::default())
    }

    /// Create a store whose client is built from `config`.
    ///
    /// Redirect policy and connect timeout are client-level and fixed here;
    /// headers and the request timeout are applied per download from the
    /// cycle's own config.
    pub fn with_config(config: &DownloadConfig) -> Result<Self, TransferError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }
}

#[async_trait::async_trait]
impl FileStore for HttpFileStore {
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn exists(&self, path: &Path) -> std::io::Result<bool> {
        fs::try_exists(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        fs::rename(from, to).await
    }

    async fn download(
        &self,
        uri: &str,
        dest: &Path,
        config: &DownloadConfig,
        on_progress: &(dyn Fn(Progress) + Send + Sync),
    ) -> Result<Option<u16>, TransferError> {
        let mut request = self.client.get(uri).headers(config.headers.clone());

        if !config.timeout.is_zero() {
            request = request.timeout(config.timeout);
        }

        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            // Leave the body unread; the engine turns this into BadResponse.
            return Ok(Some(status.as_u16()));
        }

        let total_bytes = response.content_length();
        let mut file = fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
            on_progress(Progress {
                bytes_written,
                total_bytes,
            });
        }

        file.flush().await?;
        debug!(uri = %uri, dest = ?dest, bytes = bytes_written, "transfer complete");

        Ok(Some(status.as_u16()))
    }
}
