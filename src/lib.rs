//! sprig - branch-list cache and live PR/CI status polling engine for
//! worktree sidebars.
//!
//! The view layer renders [`engine::SidebarEngine`]'s exposed state and
//! feeds it UI events; the backend command layer implements
//! [`fetcher::BranchFetcher`]. Everything in between - scoped caching
//! with stale-while-revalidate, status polling with focus- and
//! flight-aware suppression, debounced filtering, deterministic sorting -
//! lives here.

pub mod branch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod fetcher;
pub mod filter;
pub mod sort;
pub mod status;

pub use branch::{BranchRecord, BranchView, DivergenceStatus, Scope, ViewMode};
pub use cache::BranchStore;
pub use config::EngineConfig;
pub use engine::{EngineEvent, SidebarEngine};
pub use fetcher::{BranchFetcher, FetchError, FetchResult};
pub use sort::SortMode;
pub use status::{
    CheckRunSummary, CiState, GhCliStatus, PrStatusResponse, PrStatusSummary, ReviewSummary,
};
