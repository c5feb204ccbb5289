use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::branch::{BranchRecord, BranchView, Scope, ViewMode};
use crate::cache::BranchStore;
use crate::config::EngineConfig;
use crate::fetcher::{BranchFetcher, FetchResult};
use crate::filter::{filter_branches, DebouncedFilter};
use crate::sort::{sort, sort_merged, SortMode};
use crate::status::{GhCliStatus, PrStatusResponse, PrStatusSummary};

/// バックグラウンドタスクからエンジンへ届くイベント
#[derive(Debug)]
pub enum EngineEvent {
    BranchesFetched {
        scope: Scope,
        background: bool,
        result: FetchResult<Vec<BranchRecord>>,
    },
    PrStatusFetched {
        generation: u64,
        bootstrap: bool,
        result: FetchResult<PrStatusResponse>,
    },
    PollTick {
        generation: u64,
    },
    DebounceElapsed {
        generation: u64,
    },
}

/// PR/CI ステータスのポーリング状態。プロセス全体で一つ。
#[derive(Debug, Default)]
struct PrPollState {
    statuses: HashMap<String, Option<PrStatusSummary>>,
    gh_status: Option<GhCliStatus>,
    /// At most one status fetch in flight per project.
    in_flight: bool,
    /// Whether the immediate post-branch-list fetch was already issued
    /// for the current project.
    bootstrapped: bool,
    /// Bootstrap failure surfaced to the view; tick failures are only
    /// logged.
    error: Option<String>,
    /// Bumped on every project switch. Resolutions carrying an older
    /// generation are discarded on arrival.
    generation: u64,
}

impl PrPollState {
    /// Project switch: stale PR badges must never render under the new
    /// project's branches.
    fn reset(&mut self) {
        self.statuses.clear();
        self.gh_status = None;
        self.in_flight = false;
        self.bootstrapped = false;
        self.error = None;
        self.generation += 1;
    }
}

/// サイドバーのブランチ一覧エンジン。キャッシュ、PR ステータスの
/// ポーリング、デバウンス付きフィルタをまとめ、ビュー層へは観測
/// 可能な状態だけを公開する。
///
/// All mutation happens on the owner; spawned tasks only fetch and send
/// an [`EngineEvent`] back. The owner drains events via
/// [`SidebarEngine::pump`] (or `next_event` + `handle_event`), checking
/// relevance before applying every asynchronous result.
pub struct SidebarEngine<F: BranchFetcher> {
    fetcher: Arc<F>,
    config: EngineConfig,
    store: BranchStore<F>,
    pr: PrPollState,
    filter: DebouncedFilter,
    sort_mode: SortMode,
    view: ViewMode,
    project_path: Option<PathBuf>,
    search_focused: bool,
    visible: Vec<BranchRecord>,
    #[cfg(test)]
    recomputes: u64,
    tx: mpsc::Sender<EngineEvent>,
    rx: mpsc::Receiver<EngineEvent>,
    poll_cancel: Option<CancellationToken>,
}

impl<F: BranchFetcher> SidebarEngine<F> {
    pub fn new(fetcher: Arc<F>, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let store = BranchStore::new(Arc::clone(&fetcher), tx.clone(), config.branch_ttl());

        Self {
            fetcher,
            config,
            store,
            pr: PrPollState::default(),
            filter: DebouncedFilter::new(),
            sort_mode: SortMode::default(),
            view: ViewMode::default(),
            project_path: None,
            search_focused: false,
            visible: Vec::new(),
            #[cfg(test)]
            recomputes: 0,
            tx,
            rx,
            poll_cancel: None,
        }
    }

    // ==================== Operations ====================

    /// Switch the active project. Clears PR statuses synchronously,
    /// abandons in-flight status results for the old project, restarts
    /// the poll loop and requests branches for the new project.
    pub fn set_project(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.project_path.as_deref() == Some(path.as_path()) {
            return;
        }
        debug!(project = %path.display(), "switching project");
        self.project_path = Some(path);
        self.pr.reset();
        self.restart_poll_loop();
        self.request_visible(false);
        self.recompute_visible();
        if !self.visible.is_empty() {
            // Branches already cached for this project: fetch status
            // right away instead of waiting for a branch-list round trip.
            self.spawn_status_fetch(true);
        }
    }

    /// Switch the Local/Remote/All filter tab. Never triggers a status
    /// fetch; branch fetches only happen per the cache TTL rules.
    pub fn set_view(&mut self, view: ViewMode) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.request_visible(false);
        self.recompute_visible();
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        if self.sort_mode == mode {
            return;
        }
        self.sort_mode = mode;
        self.recompute_visible();
    }

    pub fn toggle_sort_mode(&mut self) {
        self.sort_mode = self.sort_mode.next();
        self.recompute_visible();
    }

    /// Record a keystroke in the branch search box. The raw query is
    /// visible immediately; the filtered list recomputes once the
    /// debounce window elapses without further keystrokes.
    pub fn set_query(&mut self, text: impl Into<String>) {
        let generation = self.filter.set_raw(text);
        // Deadline anchored at the keystroke, not at the task's first poll.
        let deadline = tokio::time::Instant::now() + self.config.debounce();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(EngineEvent::DebounceElapsed { generation }).await;
        });
    }

    /// While the search input holds focus, poll ticks are skipped
    /// entirely. Polling resumes on blur with the normal cadence.
    pub fn set_search_focus(&mut self, focused: bool) {
        self.search_focused = focused;
    }

    /// Forced refresh of every visible scope, even inside the TTL.
    pub fn refresh(&mut self) {
        self.request_visible(true);
    }

    /// Fire-and-forget freshness trigger for one scope.
    pub fn ensure_fresh(&mut self, scope: &Scope) {
        self.store.request(scope, false);
    }

    /// Cancel the poll loop. Fetch and debounce tasks die with the
    /// event channel when the engine is dropped.
    pub fn shutdown(&mut self) {
        if let Some(token) = self.poll_cancel.take() {
            token.cancel();
        }
    }

    // ==================== Event loop ====================

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain all settled background work. The view layer calls this
    /// once per frame, then renders the exposed state.
    pub fn pump(&mut self) {
        while let Some(event) = self.try_next_event() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::BranchesFetched {
                scope,
                background,
                result,
            } => {
                let applied = self.store.apply(&scope, background, result);
                if applied {
                    if self.is_scope_visible(&scope) {
                        self.recompute_visible();
                    }
                    if self.project_path.as_deref() == Some(scope.project_path.as_path())
                        && !self.pr.bootstrapped
                    {
                        self.spawn_status_fetch(true);
                    }
                }
            }
            EngineEvent::PrStatusFetched {
                generation,
                bootstrap,
                result,
            } => {
                if generation != self.pr.generation {
                    debug!("discarding PR status result from a previous project");
                    return;
                }
                self.pr.in_flight = false;
                match result {
                    Ok(response) => {
                        self.pr.statuses = response.statuses;
                        self.pr.gh_status = Some(response.gh_status);
                        self.pr.error = None;
                    }
                    Err(e) => {
                        if bootstrap {
                            self.pr.error = Some(e.to_string());
                        } else {
                            warn!(error = %e, "PR status poll failed");
                        }
                    }
                }
            }
            EngineEvent::PollTick { generation } => {
                if generation != self.pr.generation {
                    return;
                }
                if self.search_focused {
                    debug!("poll tick skipped: search input focused");
                    return;
                }
                if self.pr.in_flight {
                    debug!("poll tick skipped: status fetch in flight");
                    return;
                }
                self.spawn_status_fetch(false);
            }
            EngineEvent::DebounceElapsed { generation } => {
                if self.filter.try_apply(generation) {
                    self.recompute_visible();
                }
            }
        }
    }

    // ==================== Exposed state ====================

    /// Current filtered and sorted list for the active view.
    pub fn visible_branches(&self) -> &[BranchRecord] {
        &self.visible
    }

    pub fn is_loading(&self, scope: &Scope) -> bool {
        self.store.is_loading(scope)
    }

    pub fn load_error(&self, scope: &Scope) -> Option<&str> {
        self.store.load_error(scope)
    }

    pub fn pr_statuses(&self) -> &HashMap<String, Option<PrStatusSummary>> {
        &self.pr.statuses
    }

    pub fn gh_status(&self) -> Option<GhCliStatus> {
        self.pr.gh_status
    }

    pub fn pr_error(&self) -> Option<&str> {
        self.pr.error.as_deref()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Raw search query, reflecting keystrokes without debounce lag.
    pub fn filter_query(&self) -> &str {
        self.filter.raw()
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    // ==================== Internals ====================

    fn visible_scopes(&self) -> Vec<Scope> {
        let Some(project) = &self.project_path else {
            return Vec::new();
        };
        match self.view {
            ViewMode::Local => vec![Scope::new(project, BranchView::Local)],
            ViewMode::Remote => vec![Scope::new(project, BranchView::Remote)],
            ViewMode::All => vec![
                Scope::new(project, BranchView::Local),
                Scope::new(project, BranchView::Remote),
            ],
        }
    }

    fn is_scope_visible(&self, scope: &Scope) -> bool {
        if self.project_path.as_deref() != Some(scope.project_path.as_path()) {
            return false;
        }
        match self.view {
            ViewMode::All => true,
            ViewMode::Local => scope.view == BranchView::Local,
            ViewMode::Remote => scope.view == BranchView::Remote,
        }
    }

    fn request_visible(&mut self, force: bool) {
        for scope in self.visible_scopes() {
            self.store.request(&scope, force);
        }
    }

    fn recompute_visible(&mut self) {
        let Some(project) = self.project_path.clone() else {
            self.visible.clear();
            return;
        };
        let query = self.filter.applied().to_string();
        let mode = self.sort_mode;

        self.visible = match self.view {
            ViewMode::Local => {
                let local = self.store.branches(&Scope::new(&project, BranchView::Local));
                sort(filter_branches(local, &query), mode)
            }
            ViewMode::Remote => {
                let remote = self
                    .store
                    .branches(&Scope::new(&project, BranchView::Remote));
                sort(filter_branches(remote, &query), mode)
            }
            ViewMode::All => {
                let local = self.store.branches(&Scope::new(&project, BranchView::Local));
                let remote = self
                    .store
                    .branches(&Scope::new(&project, BranchView::Remote));
                sort_merged(
                    filter_branches(local, &query),
                    filter_branches(remote, &query),
                    mode,
                )
            }
        };
        #[cfg(test)]
        {
            self.recomputes += 1;
        }
    }

    fn spawn_status_fetch(&mut self, bootstrap: bool) {
        let Some(project) = self.project_path.clone() else {
            return;
        };
        let mut names: Vec<String> = Vec::new();
        for record in &self.visible {
            if !names.contains(&record.name) {
                names.push(record.name.clone());
            }
        }
        if names.is_empty() {
            return;
        }

        self.pr.in_flight = true;
        if bootstrap {
            self.pr.bootstrapped = true;
        }
        let generation = self.pr.generation;
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_pr_status(&project, &names).await;
            let _ = tx
                .send(EngineEvent::PrStatusFetched {
                    generation,
                    bootstrap,
                    result,
                })
                .await;
        });
    }

    fn restart_poll_loop(&mut self) {
        if let Some(token) = self.poll_cancel.take() {
            token.cancel();
        }

        let token = CancellationToken::new();
        let cancel = token.clone();
        let tx = self.tx.clone();
        let generation = self.pr.generation;
        let period = self.config.poll_interval();
        // First tick one full period out; the bootstrap fetch covers
        // the immediate slot.
        let start = tokio::time::Instant::now() + period;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(EngineEvent::PollTick { generation }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.poll_cancel = Some(token);
    }
}

impl<F: BranchFetcher> Drop for SidebarEngine<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
