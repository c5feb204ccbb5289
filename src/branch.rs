use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ブランチ一覧のビュー（キャッシュパーティション単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BranchView {
    #[default]
    Local,
    Remote,
}

impl BranchView {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Presentation-level filter tab. `All` merges the local and remote
/// cache partitions; it is never a cache key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Local,
    Remote,
    All,
}

impl ViewMode {
    pub fn next(&self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::All,
            Self::All => Self::Local,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::All => "all",
        }
    }
}

/// キャッシュパーティションキー: (プロジェクトパス, ビュー)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project_path: PathBuf,
    pub view: BranchView,
}

impl Scope {
    pub fn new(project_path: impl Into<PathBuf>, view: BranchView) -> Self {
        Self {
            project_path: project_path.into(),
            view,
        }
    }
}

/// Immutable branch snapshot from the backend. Identity is `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    pub commit: String,
    pub is_current: bool,
    pub has_remote: bool,
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    /// Last commit time, epoch seconds. None when the backend could not
    /// resolve it (e.g. unborn branch).
    pub commit_timestamp: Option<i64>,
    pub is_gone: bool,
}

impl BranchRecord {
    pub fn divergence_status(&self) -> DivergenceStatus {
        if !self.has_remote {
            return DivergenceStatus::NoRemote;
        }

        match (self.ahead, self.behind) {
            (0, 0) => DivergenceStatus::UpToDate,
            (a, 0) => DivergenceStatus::Ahead(a),
            (0, b) => DivergenceStatus::Behind(b),
            (a, b) => DivergenceStatus::Diverged {
                ahead: a,
                behind: b,
            },
        }
    }
}

/// リモートとの乖離状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceStatus {
    UpToDate,
    Ahead(usize),
    Behind(usize),
    Diverged { ahead: usize, behind: usize },
    NoRemote,
}

impl std::fmt::Display for DivergenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up to date"),
            Self::Ahead(n) => write!(f, "{} ahead", n),
            Self::Behind(n) => write!(f, "{} behind", n),
            Self::Diverged { ahead, behind } => write!(f, "{} ahead, {} behind", ahead, behind),
            Self::NoRemote => write!(f, "no remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(has_remote: bool, ahead: usize, behind: usize) -> BranchRecord {
        BranchRecord {
            name: "feature/test".to_string(),
            commit: "abc1234".to_string(),
            is_current: false,
            has_remote,
            upstream: has_remote.then(|| "origin/feature/test".to_string()),
            ahead,
            behind,
            commit_timestamp: None,
            is_gone: false,
        }
    }

    #[test]
    fn test_divergence_status_classification() {
        assert_eq!(
            branch(true, 0, 0).divergence_status(),
            DivergenceStatus::UpToDate
        );
        assert_eq!(
            branch(true, 2, 0).divergence_status(),
            DivergenceStatus::Ahead(2)
        );
        assert_eq!(
            branch(true, 0, 3).divergence_status(),
            DivergenceStatus::Behind(3)
        );
        assert_eq!(
            branch(true, 1, 4).divergence_status(),
            DivergenceStatus::Diverged { ahead: 1, behind: 4 }
        );
        assert_eq!(
            branch(false, 5, 5).divergence_status(),
            DivergenceStatus::NoRemote
        );
    }

    #[test]
    fn test_divergence_status_display() {
        assert_eq!(DivergenceStatus::UpToDate.to_string(), "up to date");
        assert_eq!(DivergenceStatus::Ahead(2).to_string(), "2 ahead");
        assert_eq!(DivergenceStatus::Behind(1).to_string(), "1 behind");
        assert_eq!(
            DivergenceStatus::Diverged { ahead: 1, behind: 3 }.to_string(),
            "1 ahead, 3 behind"
        );
        assert_eq!(DivergenceStatus::NoRemote.to_string(), "no remote");
    }

    #[test]
    fn test_scope_equality_includes_project_path() {
        let a = Scope::new("/work/alpha", BranchView::Local);
        let b = Scope::new("/work/beta", BranchView::Local);
        let c = Scope::new("/work/alpha", BranchView::Remote);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Scope::new("/work/alpha", BranchView::Local));
    }

    #[test]
    fn test_view_mode_cycle() {
        assert_eq!(ViewMode::Local.next(), ViewMode::Remote);
        assert_eq!(ViewMode::Remote.next(), ViewMode::All);
        assert_eq!(ViewMode::All.next(), ViewMode::Local);
    }
}
