//! Run lifecycle controller.
//!
//! Owns start/cancel/quit orchestration and emits events for presentation
//! layers. One run at a time; a fresh engine is spawned per run.

use crate::engine::{EngineControl, SqlmapEngine};
use crate::model::{InfoEvent, RunConfig, RunEvent, RunStatus};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control runs.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Launch a run with the given configuration (built at click time).
    Start(Box<RunConfig>),
    /// Kill the active run, if any.
    Cancel,
    Quit,
}

/// Internal handle for a running engine task.
struct RunCtx {
    cfg: RunConfig,
    ctrl_tx: UnboundedSender<EngineControl>,
    handle: Option<tokio::task::JoinHandle<Result<RunStatus>>>,
}

fn start_run(cfg: RunConfig, event_tx: UnboundedSender<RunEvent>) -> RunCtx {
    let (ctrl_tx, ctrl_rx) = tokio::sync::mpsc::unbounded_channel::<EngineControl>();
    let engine = SqlmapEngine::new(cfg.clone());
    let handle = tokio::spawn(async move { engine.run(event_tx, ctrl_rx).await });
    RunCtx {
        cfg,
        ctrl_tx,
        handle: Some(handle),
    }
}

/// Orchestrate runs based on UI commands and emit events back to the UI.
pub(crate) async fn run_controller(
    history_path: PathBuf,
    event_tx: UnboundedSender<RunEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_ctx: Option<RunCtx> = None;
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Start(cfg)) => {
                        if run_ctx.is_some() {
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(
                                "A run is already in progress.".into(),
                            )));
                        } else {
                            run_ctx = Some(start_run(*cfg, event_tx.clone()));
                        }
                    }
                    Some(UiCommand::Cancel) => {
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(
                                "Cancelling…".into(),
                            )));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the active run so history is written
                        // before the process exits.
                        quit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                        } else {
                            break Ok(());
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it
            // can be dropped when another branch is chosen and completion is
            // never observed.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    let ctx = match run_ctx.take() {
                        Some(ctx) => ctx,
                        None => continue,
                    };
                    match join_res {
                        Ok(Ok(status)) => {
                            let processed = super::post_process::process_run_completion(
                                &ctx.cfg,
                                &history_path,
                                status,
                            );
                            let _ = event_tx.send(RunEvent::RunCompleted {
                                record: Box::new(processed.record),
                                history: processed.history,
                            });
                        }
                        Ok(Err(e)) => {
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(format!(
                                "Run failed: {e:#}"
                            ))));
                        }
                        Err(e) => {
                            let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(format!(
                                "Run join failed: {e}"
                            ))));
                        }
                    }
                    if quit_pending {
                        break Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunOptions;
    use tokio::sync::mpsc;

    fn echo_cfg(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            target_url: "http://127.0.0.1/?id=1".into(),
            options: RunOptions::default(),
            sqlmap_program: "echo".into(),
            output_base: dir.join("output"),
            dump_rel: "dump/dvwa/users.csv".into(),
            log_name: "log".into(),
            preview_lines: 400,
            timeout: None,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn start_then_quit_records_one_run() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("run_history.json");
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let controller = tokio::spawn(run_controller(history_path.clone(), event_tx, cmd_rx));
        cmd_tx
            .send(UiCommand::Start(Box::new(echo_cfg(dir.path()))))
            .unwrap();

        let mut completed = None;
        while let Some(ev) = event_rx.recv().await {
            if let RunEvent::RunCompleted { record, history } = ev {
                completed = Some((record, history));
                break;
            }
        }
        cmd_tx.send(UiCommand::Quit).unwrap();
        controller.await.unwrap().unwrap();

        let (record, history) = completed.expect("run completion event");
        assert_eq!(record.returncode, 0);
        // The event ships the reloaded history so the UI never re-reads disk.
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], *record);
        assert_eq!(crate::storage::load_history(&history_path).len(), 1);
    }
}
