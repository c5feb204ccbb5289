use std::cmp::Ordering;

use crate::branch::BranchRecord;

/// 並び順モード。表示専用でキャッシュ内容には影響しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    ByName,
    ByUpdated,
}

impl SortMode {
    pub fn next(&self) -> Self {
        match self {
            Self::ByName => Self::ByUpdated,
            Self::ByUpdated => Self::ByName,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ByName => "name",
            Self::ByUpdated => "updated",
        }
    }
}

/// main と develop は常に先頭に固定する
fn pin_rank(name: &str) -> u8 {
    match name {
        "main" => 0,
        "develop" => 1,
        _ => 2,
    }
}

fn compare(a: &BranchRecord, b: &BranchRecord, mode: SortMode) -> Ordering {
    pin_rank(&a.name)
        .cmp(&pin_rank(&b.name))
        .then_with(|| match mode {
            SortMode::ByName => a.name.cmp(&b.name),
            SortMode::ByUpdated => match (a.commit_timestamp, b.commit_timestamp) {
                // Newest first; missing timestamps sort after everything
                // that has one, name as tie-break.
                (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.name.cmp(&b.name)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.name.cmp(&b.name),
            },
        })
}

/// Deterministic total ordering of one cache partition.
pub fn sort(mut records: Vec<BranchRecord>, mode: SortMode) -> Vec<BranchRecord> {
    records.sort_by(|a, b| compare(a, b, mode));
    records
}

/// All-mode: order each partition independently, local first.
pub fn sort_merged(
    local: Vec<BranchRecord>,
    remote: Vec<BranchRecord>,
    mode: SortMode,
) -> Vec<BranchRecord> {
    let mut result = sort(local, mode);
    result.extend(sort(remote, mode));
    result
}
