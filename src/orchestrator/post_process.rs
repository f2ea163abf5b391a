//! Post-run processing.
//!
//! After the engine's stream closes: locate the sqlmap output directory,
//! scrape artifacts, build the immutable history record, and persist it.

use crate::engine::{artifacts, locate};
use crate::model::{RunConfig, RunRecord, RunStatus};
use crate::storage;
use std::path::Path;

/// Cap on preview text carried inside a persisted history record.
const RECORD_PREVIEW_CHARS: usize = 2000;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub record: RunRecord,
    /// Reloaded history including the new record, newest first.
    pub history: Vec<RunRecord>,
}

/// Process a completed run and append it to history. History write failures
/// degrade to an in-memory record; the run itself is never lost to the UI.
pub(crate) fn process_run_completion(
    cfg: &RunConfig,
    history_path: &Path,
    status: RunStatus,
) -> ProcessedRun {
    let output_dir = locate::locate_output_dir(&cfg.output_base, &cfg.target_url);
    let bundle = if output_dir.exists() {
        artifacts::extract(&output_dir, &cfg.dump_rel, &cfg.log_name, cfg.preview_lines)
    } else {
        artifacts::ArtifactBundle::default()
    };

    let record = RunRecord {
        timestamp_utc: now_rfc3339(),
        target: cfg.target_url.clone(),
        options: cfg.options.clone(),
        summary: cfg.options.summary(),
        returncode: status.code(),
        output_dir: Some(output_dir),
        dump_path: bundle.dump_path,
        dump_preview: bundle.dump_preview.map(|p| truncate_chars(p, RECORD_PREVIEW_CHARS)),
        log_path: bundle.log_path,
        log_preview: bundle.log_preview.map(|p| truncate_chars(p, RECORD_PREVIEW_CHARS)),
    };

    let _ = storage::append_run(history_path, record.clone());
    let history = storage::load_history(history_path);

    ProcessedRun { record, history }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunOptions, RunStatus};
    use std::path::PathBuf;

    fn cfg(base: PathBuf, target: &str) -> RunConfig {
        RunConfig {
            target_url: target.into(),
            options: RunOptions {
                dbs: true,
                dump: true,
                ..Default::default()
            },
            sqlmap_program: "sqlmap".into(),
            output_base: base,
            dump_rel: "dump/dvwa/users.csv".into(),
            log_name: "log".into(),
            preview_lines: 400,
            timeout: None,
        }
    }

    #[test]
    fn completed_run_lands_at_head_of_history() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("output");
        let target_dir = base.join("10.0.0.5");
        std::fs::create_dir_all(&target_dir).unwrap();
        std::fs::write(target_dir.join("log"), "resumed session\n").unwrap();

        let history_path = dir.path().join("run_history.json");
        let processed = process_run_completion(
            &cfg(base, "http://10.0.0.5/vuln?id=1"),
            &history_path,
            RunStatus::Exited(0),
        );

        assert_eq!(processed.record.returncode, 0);
        assert_eq!(processed.record.summary, "dbs, dump");
        assert_eq!(processed.record.output_dir, Some(target_dir.clone()));
        assert_eq!(processed.record.log_path, Some(target_dir.join("log")));
        assert_eq!(processed.record.log_preview.as_deref(), Some("resumed session"));
        assert_eq!(processed.history.first(), Some(&processed.record));
    }

    #[test]
    fn unresolved_output_dir_still_produces_record() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("run_history.json");
        let processed = process_run_completion(
            &cfg(dir.path().join("missing-base"), "http://10.9.9.9/"),
            &history_path,
            RunStatus::NotFound,
        );

        assert_eq!(processed.record.returncode, -1);
        assert!(processed.record.dump_path.is_none());
        assert!(processed.record.log_path.is_none());
        assert_eq!(processed.history.len(), 1);
    }

    #[test]
    fn stored_previews_are_capped() {
        let long = "x".repeat(5000);
        assert_eq!(truncate_chars(long, RECORD_PREVIEW_CHARS).len(), 2000);
    }
}
