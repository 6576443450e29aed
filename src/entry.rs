//! # Entry
//!
//! Per-URI state machine. An entry owns the waiter and progress lists for
//! one URI and drives a fetch cycle from digest computation through
//! notification. The single-flight guarantee lives here: a cycle starts only
//! when the waiter count goes from zero to one, and that check-and-set runs
//! under a synchronous lock so it can never interleave with another enqueue.

use std::mem;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use rand::RngExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::CacheShared;
use crate::config::DownloadConfig;
use crate::error::CacheError;
use crate::progress::{OnProgress, Progress};

const TEMP_SUFFIX_LEN: usize = 10;
const HEX_ALPHABET: &[u8] = b"1234567890abcdef";

pub(crate) type CycleOutcome = Result<PathBuf, CacheError>;

/// One per distinct URI, owned by the cache for the process lifetime.
///
/// Logically stateless between cycles: completion drains the waiter and
/// progress lists, and the next request for the same URI starts a fresh
/// cycle that re-derives the digest and re-checks existence.
pub(crate) struct Entry {
    uri: String,
    shared: Arc<CacheShared>,
    state: Mutex<PendingState>,
}

struct PendingState {
    /// Config for the next cycle; replaced by the request that starts one.
    config: DownloadConfig,
    waiters: Vec<oneshot::Sender<CycleOutcome>>,
    progress: Vec<OnProgress>,
}

impl Entry {
    pub(crate) fn new(uri: &str, config: DownloadConfig, shared: Arc<CacheShared>) -> Self {
        Self {
            uri: uri.to_owned(),
            shared,
            state: Mutex::new(PendingState {
                config,
                waiters: Vec::new(),
                progress: Vec::new(),
            }),
        }
    }

    /// Register one caller's interest and start a fetch cycle if none is in
    /// flight. Returns the channel the cycle outcome will arrive on.
    pub(crate) fn enqueue(
        self: &Arc<Self>,
        config: Option<DownloadConfig>,
        on_progress: Option<OnProgress>,
    ) -> oneshot::Receiver<CycleOutcome> {
        let (tx, rx) = oneshot::channel();

        let start_cycle = {
            let mut state = self.state.lock();
            state.waiters.push(tx);
            if let Some(cb) = on_progress {
                state.progress.push(cb);
            }

            // Single-flight: only the request that takes the waiter list
            // from empty to one kicks off a cycle. A config passed while a
            // fetch is in flight is ignored for the current cycle.
            if state.waiters.len() == 1 {
                if let Some(config) = config {
                    state.config = config;
                }
                true
            } else {
                false
            }
        };

        if start_cycle {
            let entry = Arc::clone(self);
            tokio::spawn(async move {
                debug!(uri = %entry.uri, "starting fetch cycle");
                // A panicking provider must still drain the waiter list,
                // otherwise every later request for this URI would hang.
                let outcome = match AssertUnwindSafe(entry.run_cycle()).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(CacheError::Abandoned),
                };
                entry.finish(outcome);
            });
        }

        rx
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let digest = self.shared.keyer.hash(&self.uri).await?;
        let local = self.shared.cache_root.join(&digest);

        self.shared.ensure_cache_root().await?;

        if self.shared.store.exists(&local).await? {
            // Trusted as-is: no validation that the file is complete.
            debug!(uri = %self.uri, path = ?local, "cache hit");
            return Ok(local);
        }

        self.download_to(&local).await
    }

    /// Download to a temp path, then publish with an atomic rename so a
    /// failed transfer never leaves a partial file at the canonical path.
    async fn download_to(&self, local: &Path) -> CycleOutcome {
        let tmp = temp_path(local);
        let config = self.state.lock().config.clone();

        let result = self
            .shared
            .store
            .download(&self.uri, &tmp, &config, &|progress| {
                self.broadcast_progress(progress)
            })
            .await;

        match result {
            Ok(Some(200)) => {
                self.shared.store.rename(&tmp, local).await?;
                debug!(uri = %self.uri, path = ?local, "published cached file");
                Ok(local.to_path_buf())
            }
            Ok(Some(status)) => {
                warn!(uri = %self.uri, status, "transfer returned bad response");
                Err(CacheError::BadResponse {
                    status,
                    uri: self.uri.clone(),
                })
            }
            Ok(None) => {
                warn!(uri = %self.uri, "transfer returned no response");
                Err(CacheError::NoResponse {
                    uri: self.uri.clone(),
                })
            }
            Err(e) => {
                warn!(uri = %self.uri, error = %e, "transfer failed");
                Err(e.into())
            }
        }
    }

    /// Deliver a progress event to every callback registered right now.
    /// Each invocation runs on its own task so one callback cannot block or
    /// take down the others.
    fn broadcast_progress(&self, progress: Progress) {
        let subscribers = self.state.lock().progress.clone();

        for callback in subscribers {
            let event = progress.clone();
            tokio::spawn(async move {
                callback(event);
            });
        }
    }

    /// Drain both pending lists, then notify. Draining first means a waiter
    /// that immediately re-requests the same URI starts a fresh cycle
    /// instead of joining the one that just ended.
    fn finish(&self, outcome: CycleOutcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.progress.clear();
            mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            // A closed receiver just means that caller went away.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// `local` plus a dash and a 10-char random hex suffix. Non-cryptographic:
/// the suffix only disambiguates temp files, and concurrent cycles always
/// differ in the digest prefix anyway.
fn temp_path(local: &Path) -> PathBuf {
    let mut rng = rand::rng();
    let suffix: String = (0..TEMP_SUFFIX_LEN)
        .map(|_| HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char)
        .collect();

    let mut name = local.as_os_str().to_owned();
    name.push(format!("-{suffix}"));
    PathBuf::from(name)
}
