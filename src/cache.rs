//! # Fetch Cache
//!
//! The coordinator that maps URIs to entries and guarantees at most one
//! download per URI at a time. `resolve` is the whole public surface: give
//! it a URI, get back the path of a local file holding that resource.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::config::DownloadConfig;
use crate::digest::{DigestKeyer, Sha1Keyer};
use crate::entry::Entry;
use crate::error::CacheError;
use crate::progress::OnProgress;
use crate::store::{FileStore, HttpFileStore};

/// Directory name appended to the base directory when none is configured.
pub const DEFAULT_DIR_NAME: &str = "fetch-cache";

/// State shared between the cache and every entry it owns.
pub(crate) struct CacheShared {
    pub(crate) cache_root: PathBuf,
    pub(crate) store: Arc<dyn FileStore>,
    pub(crate) keyer: Arc<dyn DigestKeyer>,
    root_ready: AtomicBool,
    strict_root: bool,
}

impl CacheShared {
    /// Idempotent cache-root creation, attempted at most once until it is
    /// marked ready.
    ///
    /// In the default lenient mode a creation failure is logged and the root
    /// is optimistically marked ready anyway; whatever truly needs the
    /// directory will fail later with a more specific error. Strict mode
    /// propagates the failure instead and leaves the flag unset so the next
    /// cycle retries.
    pub(crate) async fn ensure_cache_root(&self) -> Result<(), CacheError> {
        if self.root_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.store.create_dir_all(&self.cache_root).await {
            Ok(()) => {
                self.root_ready.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) if self.strict_root => Err(e.into()),
            Err(e) => {
                warn!(dir = ?self.cache_root, error = %e, "failed to create cache root");
                self.root_ready.store(true, Ordering::Release);
                Ok(())
            }
        }
    }
}

/// Builder for [`FetchCache`].
pub struct CacheBuilder {
    dir_name: String,
    base_dir: Option<PathBuf>,
    strict_cache_root: bool,
    download_config: DownloadConfig,
    store: Option<Arc<dyn FileStore>>,
    keyer: Option<Arc<dyn DigestKeyer>>,
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self {
            dir_name: DEFAULT_DIR_NAME.to_owned(),
            base_dir: None,
            strict_cache_root: false,
            download_config: DownloadConfig::default(),
            store: None,
            keyer: None,
        }
    }

    /// Name of the cache directory under the base directory.
    pub fn dir_name(mut self, name: impl Into<String>) -> Self {
        self.dir_name = name.into();
        self
    }

    /// Base directory the cache root lives under. Defaults to the system
    /// temp directory.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Propagate cache-root creation failures instead of logging and
    /// optimistically continuing.
    pub fn strict_cache_root(mut self, strict: bool) -> Self {
        self.strict_cache_root = strict;
        self
    }

    /// Default download config for cycles whose starting request passes none.
    pub fn download_config(mut self, config: DownloadConfig) -> Self {
        self.download_config = config;
        self
    }

    /// Swap in a custom transfer provider.
    pub fn store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Swap in a custom digest keyer.
    pub fn keyer(mut self, keyer: Arc<dyn DigestKeyer>) -> Self {
        self.keyer = Some(keyer);
        self
    }

    pub fn build(self) -> Result<FetchCache, CacheError> {
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(HttpFileStore::with_config(&self.download_config)?),
        };
        let keyer = self.keyer.unwrap_or_else(|| Arc::new(Sha1Keyer));

        let base_dir = self.base_dir.unwrap_or_else(std::env::temp_dir);
        let cache_root = base_dir.join(&self.dir_name);

        Ok(FetchCache {
            shared: Arc::new(CacheShared {
                cache_root,
                store,
                keyer,
                root_ready: AtomicBool::new(false),
                strict_root: self.strict_cache_root,
            }),
            default_config: self.download_config,
            entries: Mutex::new(HashMap::new()),
        })
    }
}

/// Disk-backed cache for remotely fetched resources.
///
/// Each distinct URI maps to one entry; entries are created on first
/// sight under the map lock and never removed, so the map grows for the
/// process lifetime (eviction is out of scope here). The synchronous
/// create-on-first-sight is what makes concurrent resolves for the same URI
/// share a single download.
pub struct FetchCache {
    shared: Arc<CacheShared>,
    default_config: DownloadConfig,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl FetchCache {
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Create a cache with default options.
    pub fn new() -> Result<Self, CacheError> {
        CacheBuilder::new().build()
    }

    /// Directory all cached files live under, flat, named by digest.
    pub fn cache_root(&self) -> &Path {
        &self.shared.cache_root
    }

    /// Ensure the cache root directory exists. Called lazily by every fetch
    /// cycle; exposed for callers that want to front-load the work.
    pub async fn ensure_cache_root(&self) -> Result<(), CacheError> {
        self.shared.ensure_cache_root().await
    }

    /// Resolve `uri` to the path of a local file holding its contents.
    ///
    /// Joins the in-flight fetch cycle for `uri` if one exists, otherwise
    /// starts one: digest the URI, reuse the digest-named file if present,
    /// download and atomically publish it if not. `config` is honored by
    /// the cycle this request starts; while a fetch is already in flight it
    /// is ignored. `on_progress` receives every transfer progress event
    /// fired after this call registers it.
    pub async fn resolve(
        &self,
        uri: &str,
        config: Option<DownloadConfig>,
        on_progress: Option<OnProgress>,
    ) -> Result<PathBuf, CacheError> {
        if uri.is_empty() {
            return Err(CacheError::EmptyUri);
        }

        let entry = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(uri.to_owned()).or_insert_with(|| {
                Arc::new(Entry::new(
                    uri,
                    self.default_config.clone(),
                    Arc::clone(&self.shared),
                ))
            });
            Arc::clone(entry)
        };

        match entry.enqueue(config, on_progress).await {
            Ok(outcome) => outcome,
            Err(_closed) => Err(CacheError::Abandoned),
        }
    }
}
