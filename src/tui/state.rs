use crate::model::{RunEvent, RunOptions, RunRecord, DUMP_ALL_CONFIRM_TOKEN};
use std::path::PathBuf;

/// Scrollback cap for the live console.
const CONSOLE_MAX_LINES: usize = 2000;

/// Control-panel fields reachable with Up/Down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Target,
    Dbs,
    SelectedDb,
    Tables,
    Columns,
    Users,
    Passwords,
    Roles,
    Dump,
    DumpAll,
    ConfirmDumpAll,
    SelectedTable,
    Threads,
    Level,
    Risk,
    ExtraArgs,
    RunButton,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Target,
        Field::Dbs,
        Field::SelectedDb,
        Field::Tables,
        Field::Columns,
        Field::Users,
        Field::Passwords,
        Field::Roles,
        Field::Dump,
        Field::DumpAll,
        Field::ConfirmDumpAll,
        Field::SelectedTable,
        Field::Threads,
        Field::Level,
        Field::Risk,
        Field::ExtraArgs,
        Field::RunButton,
    ];

    pub fn is_text(self) -> bool {
        matches!(
            self,
            Field::Target
                | Field::SelectedDb
                | Field::SelectedTable
                | Field::ConfirmDumpAll
                | Field::Threads
                | Field::Level
                | Field::Risk
                | Field::ExtraArgs
        )
    }
}

pub struct UiState {
    pub focus: usize,
    pub editing: bool,
    pub running: bool,
    pub show_history: bool,
    pub info: String,
    pub history_path: PathBuf,

    // Control panel values; numeric fields are kept as text and validated on run.
    pub target: String,
    pub dbs: bool,
    pub tables: bool,
    pub columns: bool,
    pub users: bool,
    pub passwords: bool,
    pub roles: bool,
    pub dump: bool,
    pub dump_all: bool,
    pub selected_db: String,
    pub selected_table: String,
    pub confirm_dump_all: String,
    pub threads: String,
    pub level: String,
    pub risk: String,
    pub extra_args: String,

    pub console: Vec<String>,
    pub last_record: Option<RunRecord>,
    pub history: Vec<RunRecord>,
    pub history_scroll: usize,
}

impl UiState {
    pub fn new(target: String, history_path: PathBuf) -> Self {
        Self {
            focus: 0,
            editing: false,
            running: false,
            show_history: false,
            info: String::new(),
            history_path,
            target,
            dbs: false,
            tables: false,
            columns: false,
            users: false,
            passwords: false,
            roles: false,
            dump: false,
            dump_all: false,
            selected_db: String::new(),
            selected_table: String::new(),
            confirm_dump_all: String::new(),
            threads: String::new(),
            level: String::new(),
            risk: String::new(),
            extra_args: String::new(),
            console: Vec::new(),
            last_record: None,
            history: Vec::new(),
            history_scroll: 0,
        }
    }

    pub fn field(&self) -> Field {
        Field::ALL[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Field::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
    }

    pub fn toggle_focused(&mut self) {
        match self.field() {
            Field::Dbs => self.dbs = !self.dbs,
            Field::Tables => self.tables = !self.tables,
            Field::Columns => self.columns = !self.columns,
            Field::Users => self.users = !self.users,
            Field::Passwords => self.passwords = !self.passwords,
            Field::Roles => self.roles = !self.roles,
            Field::Dump => self.dump = !self.dump,
            Field::DumpAll => self.dump_all = !self.dump_all,
            _ => {}
        }
    }

    pub fn edit_buffer(&mut self) -> Option<&mut String> {
        match self.field() {
            Field::Target => Some(&mut self.target),
            Field::SelectedDb => Some(&mut self.selected_db),
            Field::SelectedTable => Some(&mut self.selected_table),
            Field::ConfirmDumpAll => Some(&mut self.confirm_dump_all),
            Field::Threads => Some(&mut self.threads),
            Field::Level => Some(&mut self.level),
            Field::Risk => Some(&mut self.risk),
            Field::ExtraArgs => Some(&mut self.extra_args),
            _ => None,
        }
    }

    fn push_console(&mut self, line: String) {
        self.console.push(line);
        if self.console.len() > CONSOLE_MAX_LINES {
            let excess = self.console.len() - CONSOLE_MAX_LINES;
            self.console.drain(0..excess);
        }
    }

    pub fn apply_event(&mut self, ev: RunEvent) {
        match ev {
            RunEvent::Started { command } => {
                self.running = true;
                self.push_console(format!("> {command}"));
            }
            RunEvent::Output(line) => self.push_console(line),
            RunEvent::Info(info) => {
                let msg = info.to_message();
                self.push_console(msg.clone());
                self.info = msg;
            }
            RunEvent::RunCompleted { record, history } => {
                self.running = false;
                self.info = format!(
                    "Run finished and recorded to history (return code {}).",
                    record.returncode
                );
                self.last_record = Some(*record);
                self.history = history;
                self.history_scroll = 0;
            }
        }
    }

    /// Validate the panel fields into `RunOptions`. Invalid input blocks the
    /// run with a message before anything is spawned.
    pub fn build_options(&self) -> Result<RunOptions, String> {
        if self.target.trim().is_empty() {
            return Err("Please provide a target URL.".into());
        }
        if self.dump_all && self.confirm_dump_all.trim() != DUMP_ALL_CONFIRM_TOKEN {
            return Err(format!(
                "You must type {DUMP_ALL_CONFIRM_TOKEN} to enable --dump-all."
            ));
        }

        let threads = parse_bounded(&self.threads, 1, 50, "Threads")?;
        let level = parse_bounded(&self.level, 1, 5, "Level")?;
        let risk = parse_bounded(&self.risk, 1, 3, "Risk")?;

        let extra_args = non_empty(&self.extra_args);
        if let Some(extra) = extra_args.as_deref() {
            if shell_words::split(extra).is_err() {
                return Err("Extra args have unbalanced quoting; fix them before running.".into());
            }
        }

        let mut options = RunOptions {
            dbs: self.dbs,
            tables: self.tables,
            columns: self.columns,
            dump: self.dump,
            dump_all: self.dump_all,
            users: self.users,
            passwords: self.passwords,
            roles: self.roles,
            selected_db: non_empty(&self.selected_db),
            selected_table: non_empty(&self.selected_table),
            threads: threads.map(|v| v as u32),
            level: level.map(|v| v as u8),
            risk: risk.map(|v| v as u8),
            extra_args,
        };
        options.confirm_dump_all(&self.confirm_dump_all);
        Ok(options)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn parse_bounded(s: &str, min: u64, max: u64, label: &str) -> Result<Option<u64>, String> {
    let t = s.trim();
    if t.is_empty() {
        return Ok(None);
    }
    match t.parse::<u64>() {
        Ok(v) if (min..=max).contains(&v) => Ok(Some(v)),
        _ => Err(format!("{label} must be a number between {min} and {max}.")),
    }
}
