use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::branch::BranchRecord;
use crate::status::PrStatusResponse;

/// Errors crossing the fetcher boundary. The backend command layer maps
/// its own failures onto these before they reach the engine.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend command failed: {0}")]
    Command(String),
    #[error("failed to parse backend response: {0}")]
    Parse(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// エンジンが消費する非同期データソースの抽象。実装はバックエンド
/// コマンド層が持ち、このクレートはトレイトのみを公開する。
#[async_trait]
pub trait BranchFetcher: Send + Sync + 'static {
    async fn fetch_local_branches(&self, project_path: &Path) -> FetchResult<Vec<BranchRecord>>;

    async fn fetch_remote_branches(&self, project_path: &Path) -> FetchResult<Vec<BranchRecord>>;

    /// PR/CI ステータスの一括取得。`branch_names` は現在表示中の
    /// ブランチ集合。
    async fn fetch_pr_status(
        &self,
        project_path: &Path,
        branch_names: &[String],
    ) -> FetchResult<PrStatusResponse>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::status::GhCliStatus;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scriptable fetcher for engine and cache tests. Per-project results
    /// are set up front; call counters observe how often the engine
    /// actually hits the "backend". Optional delays keep a fetch pending
    /// until the paused test clock is advanced past them.
    #[derive(Default)]
    pub struct MockFetcher {
        local: Mutex<HashMap<PathBuf, FetchResult<Vec<BranchRecord>>>>,
        /// Per-call queue consumed before the `local` fallback; lets a
        /// test give two concurrent fetches different payloads.
        local_queue: Mutex<HashMap<PathBuf, Vec<FetchResult<Vec<BranchRecord>>>>>,
        remote: Mutex<HashMap<PathBuf, FetchResult<Vec<BranchRecord>>>>,
        status: Mutex<HashMap<PathBuf, FetchResult<PrStatusResponse>>>,
        branch_delay: Mutex<Option<Duration>>,
        status_delay: Mutex<Option<Duration>>,
        pub local_calls: AtomicUsize,
        pub remote_calls: AtomicUsize,
        pub status_calls: AtomicUsize,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_local(&self, project: impl Into<PathBuf>, result: FetchResult<Vec<BranchRecord>>) {
            self.local.lock().unwrap().insert(project.into(), result);
        }

        pub fn push_local(
            &self,
            project: impl Into<PathBuf>,
            result: FetchResult<Vec<BranchRecord>>,
        ) {
            self.local_queue
                .lock()
                .unwrap()
                .entry(project.into())
                .or_default()
                .push(result);
        }

        pub fn set_remote(
            &self,
            project: impl Into<PathBuf>,
            result: FetchResult<Vec<BranchRecord>>,
        ) {
            self.remote.lock().unwrap().insert(project.into(), result);
        }

        pub fn set_status(
            &self,
            project: impl Into<PathBuf>,
            result: FetchResult<PrStatusResponse>,
        ) {
            self.status.lock().unwrap().insert(project.into(), result);
        }

        /// Hold branch fetches open for `delay` of (paused) test time.
        pub fn set_branch_delay(&self, delay: Duration) {
            *self.branch_delay.lock().unwrap() = Some(delay);
        }

        pub fn set_status_delay(&self, delay: Duration) {
            *self.status_delay.lock().unwrap() = Some(delay);
        }

        pub fn local_calls(&self) -> usize {
            self.local_calls.load(Ordering::SeqCst)
        }

        pub fn remote_calls(&self) -> usize {
            self.remote_calls.load(Ordering::SeqCst)
        }

        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        fn lookup_branches(
            map: &Mutex<HashMap<PathBuf, FetchResult<Vec<BranchRecord>>>>,
            project: &Path,
        ) -> FetchResult<Vec<BranchRecord>> {
            map.lock()
                .unwrap()
                .get(project)
                .cloned()
                .unwrap_or_else(|| Ok(vec![]))
        }
    }

    pub fn empty_status_response() -> PrStatusResponse {
        PrStatusResponse {
            statuses: HashMap::new(),
            gh_status: GhCliStatus {
                available: true,
                authenticated: true,
            },
        }
    }

    #[async_trait]
    impl BranchFetcher for MockFetcher {
        async fn fetch_local_branches(
            &self,
            project_path: &Path,
        ) -> FetchResult<Vec<BranchRecord>> {
            self.local_calls.fetch_add(1, Ordering::SeqCst);
            let queued = {
                let mut queue = self.local_queue.lock().unwrap();
                match queue.get_mut(project_path) {
                    Some(results) if !results.is_empty() => Some(results.remove(0)),
                    _ => None,
                }
            };
            let delay = *self.branch_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match queued {
                Some(result) => result,
                None => Self::lookup_branches(&self.local, project_path),
            }
        }

        async fn fetch_remote_branches(
            &self,
            project_path: &Path,
        ) -> FetchResult<Vec<BranchRecord>> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.branch_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Self::lookup_branches(&self.remote, project_path)
        }

        async fn fetch_pr_status(
            &self,
            project_path: &Path,
            _branch_names: &[String],
        ) -> FetchResult<PrStatusResponse> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.status_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.status
                .lock()
                .unwrap()
                .get(project_path)
                .cloned()
                .unwrap_or_else(|| Ok(empty_status_response()))
        }
    }
}
