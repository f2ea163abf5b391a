use super::state::{Field, UiState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw(area: Rect, f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(area);

    let header = Paragraph::new("Control panel (left) | Live console & results (center) | Run history (h)")
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("sqlmap-panel: Automated SQLi Control Panel"),
        );
    f.render_widget(header, chunks[0]);

    let body = if state.show_history {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(35),
                Constraint::Percentage(25),
            ])
            .split(chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1])
    };

    draw_control_panel(body[0], f, state);
    draw_console(body[1], f, state);
    if state.show_history {
        draw_history(body[2], f, state);
    }

    draw_status(chunks[2], f, state);
}

fn checkbox(label: &str, set: bool) -> String {
    format!("[{}] {label}", if set { "x" } else { " " })
}

fn draw_control_panel(area: Rect, f: &mut Frame, state: &UiState) {
    let focused = state.field();
    let mut lines: Vec<Line> = Vec::with_capacity(Field::ALL.len() + 4);

    for field in Field::ALL {
        let text = match field {
            Field::Target => text_field("Target URL", &state.target),
            Field::Dbs => checkbox("Enumerate databases (--dbs)", state.dbs),
            Field::SelectedDb => text_field("Selected DB", &state.selected_db),
            Field::Tables => checkbox("Enumerate tables (--tables)", state.tables),
            Field::Columns => checkbox("Enumerate columns (--columns)", state.columns),
            Field::Users => checkbox("--users", state.users),
            Field::Passwords => checkbox("--passwords", state.passwords),
            Field::Roles => checkbox("--roles", state.roles),
            Field::Dump => checkbox("Dump table (--dump)", state.dump),
            Field::DumpAll => checkbox("Dump ALL tables (--dump-all) - DANGEROUS", state.dump_all),
            Field::ConfirmDumpAll => text_field("Type CONFIRM for --dump-all", &state.confirm_dump_all),
            Field::SelectedTable => text_field("Selected Table", &state.selected_table),
            Field::Threads => text_field("Threads (1-50)", &state.threads),
            Field::Level => text_field("Level (1-5)", &state.level),
            Field::Risk => text_field("Risk (1-3)", &state.risk),
            Field::ExtraArgs => text_field("Extra sqlmap args", &state.extra_args),
            Field::RunButton => {
                if state.running {
                    "[ Run in progress… press c to cancel ]".to_string()
                } else {
                    "[ Run sqlmap ]".to_string()
                }
            }
        };

        let mut style = Style::default();
        if field == Field::ConfirmDumpAll && !state.dump_all {
            style = style.fg(Color::DarkGray);
        }
        if field == focused {
            style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        let mut text = text;
        if field == focused && state.editing {
            text.push('▏');
        }
        lines.push(Line::from(Span::styled(text, style)));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Control Panel"),
    );
    f.render_widget(panel, area);
}

fn text_field(label: &str, value: &str) -> String {
    format!("{label}: {value}")
}

fn draw_console(area: Rect, f: &mut Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(8),
            Constraint::Length(10),
        ])
        .split(area);

    // Tail the scrollback to the visible height.
    let visible = rows[0].height.saturating_sub(2) as usize;
    let start = state.console.len().saturating_sub(visible);
    let lines: Vec<Line> = state.console[start..]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();
    let console = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Live Console"),
    );
    f.render_widget(console, rows[0]);

    let summary_lines = match &state.last_record {
        Some(r) => vec![
            Line::from(vec![
                Span::styled("Target: ", Style::default().fg(Color::Gray)),
                Span::raw(r.target.clone()),
            ]),
            Line::from(vec![
                Span::styled("Finished: ", Style::default().fg(Color::Gray)),
                Span::raw(r.timestamp_utc.clone()),
                Span::raw("   "),
                Span::styled("Return code: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    r.returncode.to_string(),
                    if r.returncode == 0 {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default().fg(Color::Red)
                    },
                ),
            ]),
            Line::from(vec![
                Span::styled("Output dir: ", Style::default().fg(Color::Gray)),
                Span::raw(
                    r.output_dir
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not detected)".into()),
                ),
            ]),
            Line::from(vec![
                Span::styled("Dump: ", Style::default().fg(Color::Gray)),
                Span::raw(
                    r.dump_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none found)".into()),
                ),
            ]),
            Line::from(vec![
                Span::styled("Log: ", Style::default().fg(Color::Gray)),
                Span::raw(
                    r.log_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none found)".into()),
                ),
            ]),
        ],
        None => vec![Line::from("No completed run yet.")],
    };
    let summary = Paragraph::new(summary_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Run Summary"),
    );
    f.render_widget(summary, rows[1]);

    draw_artifact_preview(rows[2], f, state);
}

fn draw_artifact_preview(area: Rect, f: &mut Frame, state: &UiState) {
    let (title, preview) = match &state.last_record {
        Some(r) if r.dump_preview.is_some() => ("Dump Preview", r.dump_preview.as_deref()),
        Some(r) => ("Log Preview", r.log_preview.as_deref()),
        None => ("Artifact Preview", None),
    };
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = match preview {
        Some(text) => text.lines().take(visible).map(Line::from).collect(),
        None => vec![Line::from("No artifacts captured yet.")],
    };
    let block =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(block, area);
}

fn draw_history(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    if state.history.is_empty() {
        lines.push(Line::from("No run history yet."));
    }
    for record in state.history.iter().skip(state.history_scroll) {
        lines.push(Line::from(vec![
            Span::styled(
                record.timestamp_utc.clone(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  "),
            Span::raw(record.target.clone()),
        ]));
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled("opts: ", Style::default().fg(Color::Gray)),
            Span::raw(if record.summary.is_empty() {
                "(none)".to_string()
            } else {
                record.summary.clone()
            }),
            Span::raw("  "),
            Span::styled("rc: ", Style::default().fg(Color::Gray)),
            Span::raw(record.returncode.to_string()),
        ]));
        if let Some(dir) = record.output_dir.as_ref() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled("dir: ", Style::default().fg(Color::Gray)),
                Span::raw(dir.display().to_string()),
            ]));
        }
        if let Some(dump) = record.dump_path.as_ref() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled("dump: ", Style::default().fg(Color::Gray)),
                Span::raw(dump.display().to_string()),
            ]));
        }
        let preview = record
            .dump_preview
            .as_deref()
            .or(record.log_preview.as_deref());
        if let Some(preview) = preview {
            for line in preview.lines().take(3) {
                lines.push(Line::from(Span::styled(
                    format!("    {line}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    let title = format!("Run History ({})", state.history.len());
    let history = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(history, area);
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let lines = vec![
        Line::from(vec![
            Span::styled("Info: ", Style::default().fg(Color::Gray)),
            Span::raw(state.info.clone()),
        ]),
        Line::from(
            "Keys: ↑/↓ move | space toggle | enter edit/run | c cancel | h history | pgup/pgdn scroll | q quit",
        ),
    ];
    let status =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunOptions, RunRecord};
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;

    fn rendered(state: &UiState) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f.area(), f, state)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    text.push_str(cell.symbol());
                }
            }
            text.push('\n');
        }
        text
    }

    fn record_with_previews() -> RunRecord {
        RunRecord {
            timestamp_utc: "2026-01-01T00:00:00Z".into(),
            target: "http://10.0.0.5/vuln?id=1".into(),
            options: RunOptions::default(),
            summary: "dump".into(),
            returncode: 0,
            output_dir: Some(PathBuf::from("/out/10.0.0.5")),
            dump_path: Some(PathBuf::from("/out/10.0.0.5/dump/dvwa/users.csv")),
            dump_preview: Some("id,user\n1,admin".into()),
            log_path: None,
            log_preview: Some("resumed session".into()),
        }
    }

    #[test]
    fn run_summary_shows_output_dir_and_dump_preview() {
        let mut state = UiState::new("http://t/".into(), PathBuf::from("/tmp/none.json"));
        state.last_record = Some(record_with_previews());
        let text = rendered(&state);
        assert!(text.contains("Dump Preview"));
        assert!(text.contains("1,admin"));
        assert!(text.contains("/out/10.0.0.5"));
    }

    #[test]
    fn log_preview_shown_when_no_dump_was_captured() {
        let mut state = UiState::new("http://t/".into(), PathBuf::from("/tmp/none.json"));
        state.last_record = Some(RunRecord {
            dump_path: None,
            dump_preview: None,
            ..record_with_previews()
        });
        let text = rendered(&state);
        assert!(text.contains("Log Preview"));
        assert!(text.contains("resumed session"));
    }

    #[test]
    fn history_pane_shows_output_dir_and_preview_snippet() {
        let mut state = UiState::new("http://t/".into(), PathBuf::from("/tmp/none.json"));
        state.show_history = true;
        state.history = vec![record_with_previews()];
        let text = rendered(&state);
        assert!(text.contains("dir: /out/10.0.0.5"));
        assert!(text.contains("id,user"));
    }
}
