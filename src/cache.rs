use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::branch::{BranchRecord, BranchView, Scope};
use crate::engine::EngineEvent;
use crate::fetcher::{BranchFetcher, FetchResult};

/// スコープ単位のキャッシュエントリ。成功フェッチごとに `data` を
/// まるごと差し替える。部分更新はしない。
#[derive(Debug, Default)]
pub struct CacheEntry {
    data: Vec<BranchRecord>,
    /// Bumped only on a successful fetch. A failed background refresh
    /// leaves stale data visible and does not touch this.
    fetched_at: Option<Instant>,
    /// Outstanding fetches. More than one only under force-refresh.
    in_flight: u32,
    /// Whether any fetch ever succeeded for this scope.
    loaded: bool,
    /// Foreground failure surfaced to the view. Cleared on next success.
    error: Option<String>,
}

/// Per-(project, view) branch-list store with stale-while-revalidate
/// semantics. Fetches are spawned here and report back through the
/// engine event channel; the owner applies them via [`BranchStore::apply`].
pub struct BranchStore<F: BranchFetcher> {
    fetcher: Arc<F>,
    tx: mpsc::Sender<EngineEvent>,
    ttl: Duration,
    entries: HashMap<Scope, CacheEntry>,
}

impl<F: BranchFetcher> BranchStore<F> {
    pub fn new(fetcher: Arc<F>, tx: mpsc::Sender<EngineEvent>, ttl: Duration) -> Self {
        Self {
            fetcher,
            tx,
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Synchronous read of the current, possibly stale, data. An empty
    /// slice for a scope that was never requested.
    pub fn branches(&self, scope: &Scope) -> &[BranchRecord] {
        self.entries
            .get(scope)
            .map(|e| e.data.as_slice())
            .unwrap_or(&[])
    }

    /// True while the first fetch for a scope is outstanding. A scope
    /// that already rendered content never reports loading again.
    pub fn is_loading(&self, scope: &Scope) -> bool {
        self.entries
            .get(scope)
            .is_some_and(|e| e.in_flight > 0 && !e.loaded)
    }

    pub fn load_error(&self, scope: &Scope) -> Option<&str> {
        self.entries.get(scope).and_then(|e| e.error.as_deref())
    }

    /// Ensure a scope is fresh, per the stale-while-revalidate rules:
    /// - miss: start a foreground fetch, view shows loading;
    /// - fresh hit (age < TTL, not forced): nothing to do;
    /// - stale hit: keep serving stale data, start one background
    ///   refresh unless one is already in flight;
    /// - `force`: always start a foreground fetch, latest resolution wins.
    pub fn request(&mut self, scope: &Scope, force: bool) {
        let entry = self.entries.entry(scope.clone()).or_default();

        if force {
            debug!(scope = ?scope, "forced branch refresh");
            Self::spawn_fetch(&self.fetcher, &self.tx, scope.clone(), false);
            entry.in_flight += 1;
            return;
        }

        let age = entry.fetched_at.map(|at| at.elapsed());
        match age {
            None => {
                if entry.in_flight == 0 {
                    debug!(scope = ?scope, "branch cache miss");
                    Self::spawn_fetch(&self.fetcher, &self.tx, scope.clone(), false);
                    entry.in_flight += 1;
                }
            }
            Some(age) if age >= self.ttl => {
                if entry.in_flight == 0 {
                    debug!(scope = ?scope, age_ms = age.as_millis() as u64, "branch cache stale, refreshing in background");
                    Self::spawn_fetch(&self.fetcher, &self.tx, scope.clone(), true);
                    entry.in_flight += 1;
                }
            }
            Some(_) => {
                debug!(scope = ?scope, "branch cache hit");
            }
        }
    }

    /// Combined read-and-trigger: ensure freshness per the rules above,
    /// then return the current (possibly stale) data. A miss returns an
    /// empty slice immediately while the first fetch runs.
    pub fn get(&mut self, scope: &Scope, force: bool) -> &[BranchRecord] {
        self.request(scope, force);
        self.branches(scope)
    }

    /// Apply a settled fetch. Returns true when fresh data replaced the
    /// entry (the caller should recompute derived state). Results for a
    /// scope that no longer exists are discarded.
    pub fn apply(
        &mut self,
        scope: &Scope,
        background: bool,
        result: FetchResult<Vec<BranchRecord>>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(scope) else {
            debug!(scope = ?scope, "discarding branch fetch for unknown scope");
            return false;
        };

        entry.in_flight = entry.in_flight.saturating_sub(1);

        match result {
            Ok(data) => {
                entry.data = data;
                entry.fetched_at = Some(Instant::now());
                entry.loaded = true;
                entry.error = None;
                true
            }
            Err(e) => {
                if background {
                    // Stale data stays authoritative.
                    warn!(scope = ?scope, error = %e, "background branch refresh failed");
                } else {
                    entry.error = Some(e.to_string());
                }
                false
            }
        }
    }

    fn spawn_fetch(
        fetcher: &Arc<F>,
        tx: &mpsc::Sender<EngineEvent>,
        scope: Scope,
        background: bool,
    ) {
        let fetcher = Arc::clone(fetcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = match scope.view {
                BranchView::Local => fetcher.fetch_local_branches(&scope.project_path).await,
                BranchView::Remote => fetcher.fetch_remote_branches(&scope.project_path).await,
            };
            let _ = tx
                .send(EngineEvent::BranchesFetched {
                    scope,
                    background,
                    result,
                })
                .await;
        });
    }
}
