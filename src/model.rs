use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Literal token the user must type to arm `--dump-all`.
pub const DUMP_ALL_CONFIRM_TOKEN: &str = "CONFIRM";

/// Options selected in the control panel for a single sqlmap run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub dbs: bool,
    #[serde(default)]
    pub tables: bool,
    #[serde(default)]
    pub columns: bool,
    #[serde(default)]
    pub dump: bool,
    #[serde(default)]
    pub dump_all: bool,
    #[serde(default)]
    pub users: bool,
    #[serde(default)]
    pub passwords: bool,
    #[serde(default)]
    pub roles: bool,
    #[serde(default)]
    pub selected_db: Option<String>,
    #[serde(default)]
    pub selected_table: Option<String>,
    /// 1..=50 when set.
    #[serde(default)]
    pub threads: Option<u32>,
    /// 1..=5 when set.
    #[serde(default)]
    pub level: Option<u8>,
    /// 1..=3 when set.
    #[serde(default)]
    pub risk: Option<u8>,
    /// Free-form extra sqlmap arguments, tokenized with shell rules.
    #[serde(default)]
    pub extra_args: Option<String>,
}

impl RunOptions {
    /// Force `dump_all` off unless the typed confirmation matched the literal token.
    pub fn confirm_dump_all(&mut self, confirmation: &str) {
        if self.dump_all && confirmation.trim() != DUMP_ALL_CONFIRM_TOKEN {
            self.dump_all = false;
        }
    }

    /// Comma-joined names of the enumeration/dump flags that are set, for history display.
    pub fn summary(&self) -> String {
        let flags: [(&str, bool); 8] = [
            ("dbs", self.dbs),
            ("tables", self.tables),
            ("columns", self.columns),
            ("dump", self.dump),
            ("dump_all", self.dump_all),
            ("users", self.users),
            ("passwords", self.passwords),
            ("roles", self.roles),
        ];
        flags
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Full configuration for one sqlmap run, threaded explicitly through the
/// engine and post-processing instead of read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub target_url: String,
    pub options: RunOptions,
    /// Program name or full path of the sqlmap binary.
    pub sqlmap_program: String,
    /// Base directory under which sqlmap writes per-target output dirs.
    pub output_base: PathBuf,
    /// Relative path of the dump file looked up after a run.
    pub dump_rel: String,
    /// Fixed log filename looked up before falling back to `*.log` globbing.
    pub log_name: String,
    /// Line cap for file previews.
    pub preview_lines: usize,
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
}

/// Termination status of one sqlmap process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Process exited; the code is real, or heuristic when the platform gave none.
    Exited(i32),
    /// The executable could not be located; nothing was spawned.
    NotFound,
    /// Killed after the configured timeout elapsed.
    TimedOut,
    /// Killed by an explicit cancel from the UI.
    Aborted,
}

impl RunStatus {
    /// Collapse to the sentinel codes recorded in history.
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Exited(c) => c,
            RunStatus::NotFound => -1,
            RunStatus::TimedOut | RunStatus::Aborted => -2,
        }
    }
}

/// Fallback returncode inference for callers that only have the streamed text.
///
/// Any occurrence of "error" or "exception" anywhere in the combined output is
/// treated as failure. Known false-positive source: dumped data containing
/// those words trips it. The real exit code is preferred whenever available.
pub fn heuristic_returncode(output: &str) -> i32 {
    let lower = output.to_lowercase();
    if lower.contains("error") || lower.contains("exception") {
        -1
    } else {
        0
    }
}

/// One completed run, immutable once created, stored newest-first in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default)]
    pub timestamp_utc: String,
    pub target: String,
    pub options: RunOptions,
    pub summary: String,
    pub returncode: i32,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub dump_path: Option<PathBuf>,
    #[serde(default)]
    pub dump_preview: Option<String>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub log_preview: Option<String>,
}

/// Events emitted by the engine/controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A process was spawned; `command` is the display form of the argv.
    Started { command: String },
    /// One line of merged stdout/stderr.
    Output(String),
    Info(InfoEvent),
    RunCompleted {
        // Box to keep RunEvent small; RunRecord carries previews.
        record: Box<RunRecord>,
        /// Reloaded history including the new record, newest first.
        history: Vec<RunRecord>,
    },
}

/// Structured diagnostics rendered by the UI/CLI layer.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    ExecutableMissing { program: String },
    TimedOut,
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::ExecutableMissing { program } => {
                format!("sqlmap executable not found: {program}")
            }
            InfoEvent::TimedOut => "Process killed due to timeout.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_set_flags_in_order() {
        let opts = RunOptions {
            dbs: true,
            dump: true,
            roles: true,
            ..Default::default()
        };
        assert_eq!(opts.summary(), "dbs, dump, roles");
        assert_eq!(RunOptions::default().summary(), "");
    }

    #[test]
    fn dump_all_requires_literal_token() {
        let mut opts = RunOptions {
            dump_all: true,
            ..Default::default()
        };
        opts.confirm_dump_all("confirm");
        assert!(!opts.dump_all);

        let mut opts = RunOptions {
            dump_all: true,
            ..Default::default()
        };
        opts.confirm_dump_all(" CONFIRM ");
        assert!(opts.dump_all);
    }

    #[test]
    fn heuristic_flags_error_words_case_insensitively() {
        assert_eq!(heuristic_returncode("all good, 3 tables dumped"), 0);
        assert_eq!(heuristic_returncode("[CRITICAL] connection ERROR"), -1);
        assert_eq!(heuristic_returncode("unhandled Exception in thread"), -1);
    }

    #[test]
    fn status_codes_match_sentinels() {
        assert_eq!(RunStatus::Exited(3).code(), 3);
        assert_eq!(RunStatus::NotFound.code(), -1);
        assert_eq!(RunStatus::TimedOut.code(), -2);
        assert_eq!(RunStatus::Aborted.code(), -2);
    }
}
