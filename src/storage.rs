use crate::model::RunRecord;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Most recent runs kept in history; older entries are evicted on insert.
pub const MAX_HISTORY: usize = 100;

/// Default location of the run-history file.
pub fn history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlmap-panel")
        .join("run_history.json")
}

/// Load the full history, newest first. Missing or corrupt storage yields an
/// empty list, never an error.
pub fn load_history(path: &Path) -> Vec<RunRecord> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

/// Prepend a record, cap to [`MAX_HISTORY`], and persist the whole list.
///
/// Read-modify-write with no cross-process coordination; two panels finishing
/// runs at once can lose an entry. Single-writer usage is assumed.
pub fn append_run(path: &Path, record: RunRecord) -> Result<()> {
    let mut history = load_history(path);
    history.insert(0, record);
    history.truncate(MAX_HISTORY);
    persist(path, &history)
}

fn persist(path: &Path, history: &[RunRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create history dir {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(history)?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
}
