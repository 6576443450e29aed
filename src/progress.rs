use std::sync::Arc;

/// A snapshot of how far a transfer has progressed.
#[derive(Debug, Clone)]
pub struct Progress {
    /// The number of bytes written to the destination file so far.
    pub bytes_written: u64,
    /// The total number of bytes expected (if the server reported it).
    pub total_bytes: Option<u64>,
}

/// A callback function for progress updates.
///
/// Each event is delivered on its own spawned task, so a slow or panicking
/// callback never blocks its siblings or the transfer itself.
pub type OnProgress = Arc<dyn Fn(Progress) + Send + Sync>;
