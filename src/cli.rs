use crate::config::{self, PanelConfig};
use crate::model::{RunConfig, RunOptions};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sqlmap-panel",
    version,
    about = "Control panel and orchestrator for sqlmap runs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Target URL preloaded into the control panel
    #[arg(long, default_value = "http://192.168.56.10/vulnerabilities/sqli/?id=1")]
    pub target: String,

    /// Override the sqlmap output base directory
    #[arg(long)]
    pub output_base: Option<PathBuf>,

    /// Program name or full path of the sqlmap binary
    #[arg(long)]
    pub sqlmap_path: Option<String>,

    /// Panel config file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run-history file (default: platform data dir)
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Kill a panel run after this long (e.g. 10m)
    #[arg(long)]
    pub run_timeout: Option<humantime::Duration>,

    /// Relative path of the dump file scraped after a run
    #[arg(long, default_value = config::DEFAULT_DUMP_REL)]
    pub dump_rel: String,

    /// Fixed log filename looked up inside the output directory
    #[arg(long, default_value = config::DEFAULT_LOG_NAME)]
    pub log_name: String,

    /// Line cap for dump/log previews
    #[arg(long, default_value_t = config::DEFAULT_PREVIEW_LINES)]
    pub preview_lines: usize,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Capture a baseline request and run sqlmap with persisted cookies
    Orchestrate(OrchestrateArgs),
    /// Export the request section of a saved raw HTTP capture for Burp Repeater
    ExportBurp(ExportBurpArgs),
}

#[derive(Debug, clap::Args, Clone)]
pub struct OrchestrateArgs {
    /// Target URL
    #[arg(long)]
    pub url: String,

    /// HTTP method for the baseline request
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Extra sqlmap args (e.g. --extra-args --dbs --random-agent)
    #[arg(long = "extra-args", num_args = 0.., allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Timeout for the sqlmap run
    #[arg(long, default_value = "600s")]
    pub timeout: humantime::Duration,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ExportBurpArgs {
    /// Saved raw_http_<n>.txt capture
    pub raw_http: PathBuf,

    /// Output file for the request section
    pub out: PathBuf,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::config_path)
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(crate::storage::history_path)
    }
}

/// Dispatch a parsed command line. Returns the process exit code.
pub async fn run(args: Cli) -> Result<i32> {
    match args.command.clone() {
        Some(Command::Orchestrate(orch)) => {
            crate::orchestrator::baseline::run_orchestrate(&orch, &args.config_path()).await
        }
        Some(Command::ExportBurp(exp)) => {
            crate::export::export_to_burp(&exp.raw_http, &exp.out)?;
            println!("Exported request to {}", exp.out.display());
            Ok(0)
        }
        None => {
            #[cfg(feature = "tui")]
            {
                crate::tui::run(args).await?;
                Ok(0)
            }
            #[cfg(not(feature = "tui"))]
            {
                Err(anyhow::anyhow!(
                    "built without TUI support; use the orchestrate or export-burp subcommands"
                ))
            }
        }
    }
}

/// Assemble the per-run configuration from CLI flags, the panel config file,
/// and the options chosen in the panel at launch time.
pub fn build_run_config(
    args: &Cli,
    config: &PanelConfig,
    target_url: String,
    options: RunOptions,
) -> RunConfig {
    RunConfig {
        target_url,
        options,
        sqlmap_program: args
            .sqlmap_path
            .clone()
            .unwrap_or_else(|| config.sqlmap_program()),
        output_base: args
            .output_base
            .clone()
            .unwrap_or_else(|| config.output_base()),
        dump_rel: args.dump_rel.clone(),
        log_name: args.log_name.clone(),
        preview_lines: args.preview_lines,
        timeout: args.run_timeout.map(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_config_file_values() {
        let args = Cli::parse_from([
            "sqlmap-panel",
            "--sqlmap-path",
            "/opt/sqlmap/sqlmap.py",
            "--output-base",
            "/srv/out",
        ]);
        let config = PanelConfig {
            sqlmap_path: Some("sqlmap-from-config".into()),
            sqlmap_output_base: Some(PathBuf::from("/cfg/out")),
            ..Default::default()
        };
        let cfg = build_run_config(&args, &config, "http://t/".into(), RunOptions::default());
        assert_eq!(cfg.sqlmap_program, "/opt/sqlmap/sqlmap.py");
        assert_eq!(cfg.output_base, PathBuf::from("/srv/out"));
    }

    #[test]
    fn orchestrate_args_parse_with_extra_args() {
        let args = Cli::parse_from([
            "sqlmap-panel",
            "orchestrate",
            "--url",
            "http://10.0.0.1/?id=1",
            "--timeout",
            "30s",
            "--extra-args",
            "--dbs",
            "--random-agent",
        ]);
        match args.command {
            Some(Command::Orchestrate(o)) => {
                assert_eq!(o.url, "http://10.0.0.1/?id=1");
                assert_eq!(o.method, "GET");
                assert_eq!(o.extra_args, vec!["--dbs", "--random-agent"]);
                assert_eq!(std::time::Duration::from(o.timeout).as_secs(), 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
