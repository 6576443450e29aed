use std::time::Duration;

use reqwest::header::HeaderMap;

const DEFAULT_USER_AGENT: &str = concat!("fetch-cache/", env!("CARGO_PKG_VERSION"));

/// Configurable options for one fetch cycle's transfer.
///
/// The config supplied by the request that starts a cycle is the one the
/// cycle runs with; configs passed while a fetch is already in flight are
/// ignored until the next cycle.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Custom HTTP headers sent with the request
    pub headers: HeaderMap,

    /// Overall timeout for the entire HTTP request; zero disables it
    pub timeout: Duration,

    /// Connection timeout (time to establish the initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}
