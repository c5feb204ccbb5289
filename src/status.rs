use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// gh CLI の利用可否と認証状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhCliStatus {
    pub available: bool,
    pub authenticated: bool,
}

/// ブランチ単位の PR ステータス概要
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrStatusSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
    pub author: String,
    pub base_branch: String,
    pub head_branch: String,
    pub labels: Vec<String>,
    pub check_suites: Vec<CheckRunSummary>,
    pub reviews: Vec<ReviewSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRunSummary {
    pub workflow_name: String,
    pub status: String,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub reviewer: String,
    pub state: String,
}

/// ステータス一括取得のレスポンス。キーはブランチ名、PR の無い
/// ブランチは None。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrStatusResponse {
    pub statuses: HashMap<String, Option<PrStatusSummary>>,
    pub gh_status: GhCliStatus,
}

/// Aggregate CI state derived from the check suites of one PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiState {
    Passing,
    Failing,
    Pending,
    /// No check suites reported.
    None,
}

impl PrStatusSummary {
    /// Summarise check suites: any failure wins, then any run still in
    /// progress, then all-green.
    pub fn ci_state(&self) -> CiState {
        if self.check_suites.is_empty() {
            return CiState::None;
        }

        let mut pending = false;
        for suite in &self.check_suites {
            match suite.conclusion.as_deref() {
                Some("success") | Some("neutral") | Some("skipped") => {}
                Some(_) => return CiState::Failing,
                None => pending = true,
            }
            if suite.status != "completed" {
                pending = true;
            }
        }

        if pending {
            CiState::Pending
        } else {
            CiState::Passing
        }
    }
}
