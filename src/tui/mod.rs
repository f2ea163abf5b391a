mod panel;
mod state;

use crate::cli::Cli;
use crate::config::PanelConfig;
use crate::model::RunEvent;
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{Field, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the engine and the render loop.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Config is loaded once here and threaded into each run's RunConfig.
    let config = PanelConfig::load(&args.config_path());
    let history_path = args.history_path();

    // TUI runs in a dedicated thread to keep blocking terminal I/O out of the
    // Tokio runtime.
    let ui_args = args.clone();
    let ui_config = config.clone();
    let ui_history = history_path.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_args, ui_config, ui_history, event_rx, cmd_tx));

    let res = orchestrator::run_controller(history_path, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    config: PanelConfig,
    history_path: std::path::PathBuf,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(args.target.clone(), history_path);
    state.history = crate::storage::load_history(&state.history_path);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| panel::draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }

                if state.editing {
                    handle_edit_key(&mut state, k.code);
                    continue;
                }

                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Up) => state.focus_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Tab) => state.focus_next(),
                    (_, KeyCode::Char(' ')) => state.toggle_focused(),
                    (_, KeyCode::Enter) => match state.field() {
                        Field::RunButton => launch_run(&args, &config, &mut state, &cmd_tx),
                        f if f.is_text() => state.editing = true,
                        _ => state.toggle_focused(),
                    },
                    (_, KeyCode::Char('c')) => {
                        if state.running {
                            let _ = cmd_tx.send(UiCommand::Cancel);
                        }
                    }
                    (_, KeyCode::Char('h')) => {
                        state.show_history = !state.show_history;
                        if state.show_history {
                            state.history = crate::storage::load_history(&state.history_path);
                            state.history_scroll = 0;
                        }
                    }
                    (_, KeyCode::PageUp) => {
                        state.history_scroll = state.history_scroll.saturating_sub(5);
                    }
                    (_, KeyCode::PageDown) => {
                        if !state.history.is_empty() {
                            state.history_scroll =
                                (state.history_scroll + 5).min(state.history.len() - 1);
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_edit_key(state: &mut UiState, code: KeyCode) {
    match code {
        KeyCode::Enter | KeyCode::Esc => state.editing = false,
        KeyCode::Backspace => {
            if let Some(buf) = state.edit_buffer() {
                buf.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(buf) = state.edit_buffer() {
                buf.push(c);
            }
        }
        _ => {}
    }
}

fn launch_run(
    args: &Cli,
    config: &PanelConfig,
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
) {
    if state.running {
        state.info = "A run is already in progress.".into();
        return;
    }
    match state.build_options() {
        Ok(options) => {
            let cfg =
                crate::cli::build_run_config(args, config, state.target.trim().to_string(), options);
            state.console.clear();
            state.info = "Starting sqlmap…".into();
            let _ = cmd_tx.send(UiCommand::Start(Box::new(cfg)));
        }
        Err(msg) => state.info = msg,
    }
}
