pub mod args;
pub mod artifacts;
pub mod locate;

use crate::model::{heuristic_returncode, InfoEvent, RunConfig, RunEvent, RunStatus};
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Kill the running process and finish the stream.
    Cancel,
}

/// Spawns sqlmap once and streams its merged output as events. Not
/// restartable; build a fresh engine for each run.
pub struct SqlmapEngine {
    cfg: RunConfig,
}

impl SqlmapEngine {
    pub fn new(cfg: RunConfig) -> Self {
        Self { cfg }
    }

    pub async fn run(
        self,
        event_tx: mpsc::UnboundedSender<RunEvent>,
        mut control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> Result<RunStatus> {
        let argv = args::build_sqlmap_args(
            &self.cfg.sqlmap_program,
            &self.cfg.target_url,
            &self.cfg.options,
        );
        let _ = event_tx.send(RunEvent::Started {
            command: shell_words::join(&argv),
        });

        let mut child = match Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let _ = event_tx.send(RunEvent::Info(InfoEvent::ExecutableMissing {
                    program: self.cfg.sqlmap_program.clone(),
                }));
                return Ok(RunStatus::NotFound);
            }
            Err(e) => return Err(e).context("spawn sqlmap"),
        };

        // Merge stdout and stderr into one line channel; the channel closes
        // once both pipes hit EOF.
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, line_tx.clone());
        }
        drop(line_tx);

        let timeout_fut = async {
            match self.cfg.timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => futures::future::pending().await,
            }
        };
        tokio::pin!(timeout_fut);

        // Accumulated only for the returncode fallback on signal death.
        let mut output = String::new();
        let mut timed_out = false;
        let mut aborted = false;
        let mut ctrl_open = true;

        loop {
            tokio::select! {
                line = line_rx.recv() => {
                    match line {
                        Some(line) => {
                            output.push_str(&line);
                            output.push('\n');
                            let _ = event_tx.send(RunEvent::Output(line));
                        }
                        None => break,
                    }
                }
                ctrl = control_rx.recv(), if ctrl_open => {
                    match ctrl {
                        Some(EngineControl::Cancel) => {
                            aborted = true;
                            let _ = child.start_kill();
                        }
                        None => ctrl_open = false,
                    }
                }
                _ = &mut timeout_fut, if !timed_out && !aborted => {
                    timed_out = true;
                    let _ = event_tx.send(RunEvent::Info(InfoEvent::TimedOut));
                    let _ = child.start_kill();
                }
            }
        }

        let exit = child.wait().await.context("wait for sqlmap")?;
        let status = if timed_out {
            RunStatus::TimedOut
        } else if aborted {
            RunStatus::Aborted
        } else {
            match exit.code() {
                Some(code) => RunStatus::Exited(code),
                // Signal death leaves no code; fall back to the text scan.
                None => RunStatus::Exited(heuristic_returncode(&output)),
            }
        };

        let _ = event_tx.send(RunEvent::Info(InfoEvent::Message(format!(
            "Process finished with return code {}.",
            status.code()
        ))));

        Ok(status)
    }
}

/// Forward lines from a child pipe into the merged channel on a task of its own.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunOptions;
    use std::path::PathBuf;

    fn test_cfg(program: &str) -> RunConfig {
        RunConfig {
            target_url: "http://127.0.0.1/?id=1".into(),
            options: RunOptions::default(),
            sqlmap_program: program.into(),
            output_base: PathBuf::from("/tmp"),
            dump_rel: "dump/dvwa/users.csv".into(),
            log_name: "log".into(),
            preview_lines: 400,
            timeout: None,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_run_streams_output_and_exits_zero() {
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let engine = SqlmapEngine::new(test_cfg("echo"));
        let status = engine.run(evt_tx, ctrl_rx).await.unwrap();

        assert_eq!(status, RunStatus::Exited(0));

        let mut saw_started = false;
        let mut saw_output = false;
        while let Ok(ev) = evt_rx.try_recv() {
            match ev {
                RunEvent::Started { command } => {
                    saw_started = true;
                    assert!(command.starts_with("echo -u"));
                }
                RunEvent::Output(line) => {
                    saw_output = true;
                    assert!(line.contains("--batch"));
                    assert!(line.contains("--answers=follow=Y"));
                }
                _ => {}
            }
        }
        assert!(saw_started && saw_output);
    }

    #[tokio::test]
    async fn missing_executable_reports_not_found_without_spawning() {
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let engine = SqlmapEngine::new(test_cfg("sqlmap-panel-no-such-binary"));
        let status = engine.run(evt_tx, ctrl_rx).await.unwrap();

        assert_eq!(status, RunStatus::NotFound);
        assert_eq!(status.code(), -1);

        let mut saw_missing = false;
        while let Ok(ev) = evt_rx.try_recv() {
            if let RunEvent::Info(InfoEvent::ExecutableMissing { program }) = ev {
                saw_missing = true;
                assert_eq!(program, "sqlmap-panel-no-such-binary");
            }
        }
        assert!(saw_missing);
    }
}
