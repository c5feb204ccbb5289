use crate::branch::BranchRecord;

/// ブランチ名の部分一致フィルタ（大文字小文字を無視）
pub fn filter_branches(records: &[BranchRecord], query: &str) -> Vec<BranchRecord> {
    if query.is_empty() {
        return records.to_vec();
    }
    let query = query.to_lowercase();
    records
        .iter()
        .filter(|b| b.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Debounced search query. The raw query is visible immediately so the
/// input box never lags; the applied query only advances once the
/// debounce timer for the latest keystroke fires. Each keystroke bumps
/// the generation, so timers armed by earlier keystrokes are discarded
/// on arrival.
#[derive(Debug, Default)]
pub struct DebouncedFilter {
    raw: String,
    applied: String,
    generation: u64,
}

impl DebouncedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn applied(&self) -> &str {
        &self.applied
    }

    /// Record a keystroke. Returns the generation the caller must arm
    /// its debounce timer with.
    pub fn set_raw(&mut self, text: impl Into<String>) -> u64 {
        self.raw = text.into();
        self.generation += 1;
        self.generation
    }

    /// タイマー発火時の適用。世代が古ければ何もしない。
    pub fn try_apply(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.applied = self.raw.clone();
        true
    }
}
