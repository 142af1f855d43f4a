//! Shared agreement cache
//!
//! Holds the full agreement set of one directory scope as an immutable
//! snapshot. The first use drains the paginated listing; later reads clone
//! an `Arc` under a short read lock. Loads are single-flight: concurrent
//! callers that find the cache empty or stale wait on one load instead of
//! each listing the directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use edi_ir::InterchangeHeader;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agreement::{self, Agreement};
use crate::directory::{AgreementDirectory, DirectoryScope};
use crate::{Error, Result};

/// When a loaded snapshot is considered stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Load once for the life of the cache
    #[default]
    Never,
    /// Reload when the snapshot is older than the duration
    Ttl(Duration),
}

impl RefreshPolicy {
    fn is_stale(self, loaded_at: Instant) -> bool {
        match self {
            RefreshPolicy::Never => false,
            RefreshPolicy::Ttl(ttl) => loaded_at.elapsed() >= ttl,
        }
    }
}

struct Snapshot {
    agreements: Arc<Vec<Agreement>>,
    loaded_at: Instant,
}

/// Agreement cache for one directory scope
pub struct AgreementCache {
    directory: Arc<dyn AgreementDirectory>,
    scope: DirectoryScope,
    policy: RefreshPolicy,
    max_pages: usize,
    snapshot: RwLock<Option<Snapshot>>,
    load_lock: Mutex<()>,
    loads: AtomicU64,
}

impl AgreementCache {
    /// Listings longer than this are treated as a runaway directory
    pub const DEFAULT_MAX_PAGES: usize = 1_000;

    pub fn new(directory: Arc<dyn AgreementDirectory>, scope: DirectoryScope) -> Self {
        Self {
            directory,
            scope,
            policy: RefreshPolicy::default(),
            max_pages: Self::DEFAULT_MAX_PAGES,
            snapshot: RwLock::new(None),
            load_lock: Mutex::new(()),
            loads: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn scope(&self) -> &DirectoryScope {
        &self.scope
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Number of completed directory loads
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Resolve the unique agreement for an interchange header
    pub async fn resolve(
        &self,
        header: &InterchangeHeader,
        cancel: &CancellationToken,
    ) -> Result<Agreement> {
        let identity = header.identity();
        let agreements = self.agreements(cancel).await?;

        match agreement::select_unique(&agreements, &identity) {
            Ok(found) => {
                debug!(%identity, agreement = %found.name, "resolved agreement");
                Ok(found.clone())
            }
            Err(err) => {
                let matches = match &err {
                    Error::AgreementNotFound { matches, .. } => *matches,
                    _ => 0,
                };
                warn!(
                    sender_qualifier = %identity.sender_qualifier,
                    sender_id = %identity.sender_id,
                    receiver_qualifier = %identity.receiver_qualifier,
                    receiver_id = %identity.receiver_id,
                    matches,
                    "agreement not resolved"
                );
                Err(err)
            }
        }
    }

    /// Current agreement set, loading it first when empty or stale
    pub async fn agreements(&self, cancel: &CancellationToken) -> Result<Arc<Vec<Agreement>>> {
        if let Some(agreements) = self.fresh().await {
            return Ok(agreements);
        }

        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Error::directory_unavailable(&self.scope, "cancelled while waiting for agreement load"));
            }
            guard = self.load_lock.lock() => guard,
        };

        // Another caller may have finished the load while we waited.
        if let Some(agreements) = self.fresh().await {
            return Ok(agreements);
        }

        self.load(cancel).await
    }

    /// Drop the snapshot; the next use reloads
    pub async fn invalidate(&self) {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.take().is_some() {
            info!(scope = %self.scope, "agreement cache invalidated");
        }
    }

    /// Reload now regardless of policy; returns the number of agreements
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<usize> {
        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(Error::directory_unavailable(&self.scope, "cancelled while waiting for agreement load"));
            }
            guard = self.load_lock.lock() => guard,
        };
        Ok(self.load(cancel).await?.len())
    }

    /// Number of cached agreements, if loaded
    pub async fn cached_len(&self) -> Option<usize> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.agreements.len())
    }

    async fn fresh(&self) -> Option<Arc<Vec<Agreement>>> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .as_ref()
            .filter(|s| !self.policy.is_stale(s.loaded_at))
            .map(|s| Arc::clone(&s.agreements))
    }

    /// Caller must hold `load_lock`
    async fn load(&self, cancel: &CancellationToken) -> Result<Arc<Vec<Agreement>>> {
        let started = Instant::now();
        let agreements = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(scope = %self.scope, "agreement load cancelled");
                return Err(Error::directory_unavailable(&self.scope, "cancelled during agreement listing"));
            }
            listed = self.drain() => listed?,
        };

        let agreements = Arc::new(agreements);
        *self.snapshot.write().await = Some(Snapshot {
            agreements: Arc::clone(&agreements),
            loaded_at: Instant::now(),
        });
        self.loads.fetch_add(1, Ordering::SeqCst);

        info!(
            scope = %self.scope,
            directory = self.directory.name(),
            agreements = agreements.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "agreement cache loaded"
        );
        Ok(agreements)
    }

    async fn drain(&self) -> Result<Vec<Agreement>> {
        let unavailable = |e: crate::directory::DirectoryError| {
            warn!(scope = %self.scope, error = %e, "agreement listing failed");
            Error::directory_unavailable(&self.scope, e.to_string())
        };

        let mut page = self.directory.list(&self.scope).await.map_err(unavailable)?;
        let mut agreements = std::mem::take(&mut page.agreements);
        let mut pages = 1;

        while let Some(link) = page.next_link.take() {
            if pages >= self.max_pages {
                return Err(Error::directory_unavailable(
                    &self.scope,
                    format!("listing exceeded {} pages", self.max_pages),
                ));
            }
            page = self.directory.list_next(&link).await.map_err(unavailable)?;
            agreements.append(&mut page.agreements);
            pages += 1;
        }

        debug!(pages, agreements = agreements.len(), "agreement listing drained");
        Ok(agreements)
    }
}
