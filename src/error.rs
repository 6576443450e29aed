use std::sync::Arc;

/// Error raised by the underlying transfer machinery.
///
/// These wrap the non-clonable sources (reqwest, I/O) and are shared
/// between waiters behind an `Arc` when a fetch cycle fans out its outcome.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned to callers of [`FetchCache::resolve`](crate::FetchCache::resolve).
///
/// Clonable so a single fetch cycle outcome can be delivered to every
/// pending waiter for the same URI.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The transfer completed but the server answered with a non-200 status.
    #[error("server returned status code {status} for {uri}")]
    BadResponse { status: u16, uri: String },

    /// The transfer produced no response at all.
    #[error("no response received from {uri}")]
    NoResponse { uri: String },

    /// Digest computation, directory creation, existence check, download or
    /// file publication failed with an underlying error.
    #[error("transfer failed: {0}")]
    Transfer(#[source] Arc<TransferError>),

    /// An empty URI was passed to `resolve`.
    #[error("uri must not be empty")]
    EmptyUri,

    /// The fetch cycle task died before reporting an outcome.
    #[error("fetch cycle was abandoned before completing")]
    Abandoned,
}

impl From<TransferError> for CacheError {
    fn from(err: TransferError) -> Self {
        CacheError::Transfer(Arc::new(err))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Transfer(Arc::new(TransferError::Io(err)))
    }
}
