//! Cookie-backed orchestrate flow for the `orchestrate` subcommand.
//!
//! Prompts once for the DVWA session cookies and persists them, captures a
//! baseline HTTP request/response, runs sqlmap with the cookie header
//! attached, and writes all artifacts into a timestamped run directory.

use crate::cli::OrchestrateArgs;
use crate::config::{Cookies, PanelConfig};
use anyhow::{Context, Result};
use rand::RngCore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

pub const REQUEST_MARKER: &str = "----- REQUEST -----";
pub const RESPONSE_MARKER: &str = "----- RESPONSE -----";

/// Captured baseline request/response pair.
struct BaselineCapture {
    request: String,
    response: String,
    rt_ms: f64,
    status: u16,
    size: usize,
}

/// One `Database:`/`Table:` hit scraped from sqlmap stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickExtract {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    created_at: &'a str,
    sqlmap_returncode: i32,
    sqlmap_duration_s: f64,
    baseline_status: Option<u16>,
    baseline_rt_ms: Option<f64>,
    baseline_size: Option<usize>,
    extract_count: usize,
    quick_summary: &'a [QuickExtract],
}

/// Run the full orchestrate flow. Returns sqlmap's exit code for the process
/// exit status.
pub async fn run_orchestrate(args: &OrchestrateArgs, config_path: &Path) -> Result<i32> {
    let mut config = PanelConfig::load(config_path);
    let cookies = match config.cookies.clone() {
        Some(c) => c,
        None => {
            let c = prompt_cookies()?;
            config.cookies = Some(c.clone());
            config.save(config_path)?;
            println!("Saved cookies to {}", config_path.display());
            c
        }
    };
    let cookie_header = cookies.header_value();

    let ts = run_timestamp();
    let run_dir = PathBuf::from("runs").join(format!("run_{ts}_{}", gen_run_suffix()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run dir {}", run_dir.display()))?;

    let run_config = serde_json::json!({
        "url": args.url,
        "method": args.method,
        "extra_args": args.extra_args,
        "timestamp": ts,
    });
    std::fs::write(
        run_dir.join("config.json"),
        serde_json::to_string_pretty(&run_config)?,
    )?;

    println!("Capturing baseline request with cookies: {cookie_header}");
    let baseline = match capture_baseline(&args.url, &args.method, &cookie_header).await {
        Ok(b) => {
            std::fs::write(
                run_dir.join("raw_http_0.txt"),
                format!(
                    "{REQUEST_MARKER}\n{}\n\n{RESPONSE_MARKER}\n{}",
                    b.request, b.response
                ),
            )?;
            Some(b)
        }
        Err(e) => {
            std::fs::write(run_dir.join("raw_http_0.txt"), format!("ERROR: {e:#}"))?;
            None
        }
    };

    println!("Starting sqlmap run…");
    let sqlmap = run_sqlmap_capture(
        &config.sqlmap_program(),
        &args.url,
        &run_dir,
        &cookie_header,
        &args.extra_args,
        Some(args.timeout.into()),
    )
    .await?;

    let extracts = best_effort_extract(&sqlmap.stdout_path);
    let summary = RunSummary {
        run_id: run_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("run"),
        created_at: &ts,
        sqlmap_returncode: sqlmap.returncode,
        sqlmap_duration_s: sqlmap.duration_s,
        baseline_status: baseline.as_ref().map(|b| b.status),
        baseline_rt_ms: baseline.as_ref().map(|b| b.rt_ms),
        baseline_size: baseline.as_ref().map(|b| b.size),
        extract_count: extracts.len(),
        quick_summary: &extracts[..extracts.len().min(10)],
    };
    std::fs::write(
        run_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    println!("Run complete. Artifacts: {}", run_dir.display());
    Ok(sqlmap.returncode)
}

fn prompt_cookies() -> Result<Cookies> {
    println!("Cookie setup (needed for DVWA authentication)");
    let phpsessid: String = dialoguer::Input::new()
        .with_prompt("Enter your PHPSESSID (from the DVWA browser session)")
        .interact_text()
        .context("read PHPSESSID")?;
    let security: String = dialoguer::Input::new()
        .with_prompt("Enter the DVWA security level (e.g. low/medium/high)")
        .interact_text()
        .context("read security level")?;
    Ok(Cookies {
        phpsessid: phpsessid.trim().to_string(),
        security: security.trim().to_string(),
    })
}

/// Short random suffix so runs started within the same second get distinct dirs.
fn gen_run_suffix() -> String {
    let mut b = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut b);
    u32::from_le_bytes(b).to_string()
}

/// Compact UTC stamp used for run directory names.
fn run_timestamp() -> String {
    let fmt = time::macros::format_description!("[year][month][day]T[hour][minute][second]Z");
    time::OffsetDateTime::now_utc()
        .format(&fmt)
        .unwrap_or_else(|_| "unknown".into())
}

/// One baseline request to confirm access and capture raw request/response text.
async fn capture_baseline(url: &str, method: &str, cookie_header: &str) -> Result<BaselineCapture> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(20))
        .build()
        .context("build http client")?;

    let method: reqwest::Method = method
        .to_uppercase()
        .parse()
        .context("parse http method")?;
    let parsed: reqwest::Url = url.parse().context("parse target url")?;
    let path_query = match parsed.query() {
        Some(q) => format!("{}?{q}", parsed.path()),
        None => parsed.path().to_string(),
    };

    let start = Instant::now();
    let resp = client
        .request(method.clone(), parsed.clone())
        .header(reqwest::header::COOKIE, cookie_header)
        .send()
        .await
        .context("baseline request failed")?;
    let rt_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut request = format!("{method} {path_query} HTTP/1.1\n");
    request.push_str(&format!(
        "Host: {}\n",
        parsed.host_str().unwrap_or_default()
    ));
    request.push_str(&format!("Cookie: {cookie_header}\n"));

    let status = resp.status().as_u16();
    let mut response = format!("HTTP/1.1 {status}\n");
    for (name, value) in resp.headers() {
        response.push_str(&format!("{name}: {}\n", value.to_str().unwrap_or("?")));
    }
    let body = resp.text().await.unwrap_or_default();
    let size = body.len();
    response.push('\n');
    response.push_str(&body);

    Ok(BaselineCapture {
        request,
        response,
        rt_ms,
        status,
        size,
    })
}

struct SqlmapRunInfo {
    returncode: i32,
    duration_s: f64,
    stdout_path: PathBuf,
}

/// Run sqlmap with the cookie header attached, stdout/stderr captured to files.
async fn run_sqlmap_capture(
    program: &str,
    url: &str,
    run_dir: &Path,
    cookie_header: &str,
    extra_args: &[String],
    timeout: Option<Duration>,
) -> Result<SqlmapRunInfo> {
    let stdout_path = run_dir.join("sqlmap.stdout.txt");
    let stderr_path = run_dir.join("sqlmap.stderr.txt");
    let stdout_file = std::fs::File::create(&stdout_path)
        .with_context(|| format!("create {}", stdout_path.display()))?;
    let stderr_file = std::fs::File::create(&stderr_path)
        .with_context(|| format!("create {}", stderr_path.display()))?;

    let mut cmd = tokio::process::Command::new(program);
    cmd.arg("-u")
        .arg(url)
        .arg("--batch")
        .arg("--cookie")
        .arg(cookie_header)
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().with_context(|| format!("spawn {program}"))?;
    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.context("wait for sqlmap")?,
            Err(_) => {
                let _ = child.start_kill();
                child.wait().await.context("wait after timeout kill")?
            }
        },
        None => child.wait().await.context("wait for sqlmap")?,
    };

    Ok(SqlmapRunInfo {
        returncode: status.code().unwrap_or(-2),
        duration_s: start.elapsed().as_secs_f64(),
        stdout_path,
    })
}

/// Scrape `Database:`/`Table:` lines from sqlmap stdout for the quick summary.
pub fn best_effort_extract(stdout_path: &Path) -> Vec<QuickExtract> {
    let text = match std::fs::read_to_string(stdout_path) {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };
    extract_from_text(&text)
}

fn extract_from_text(text: &str) -> Vec<QuickExtract> {
    let db_re = regex::Regex::new(r"(?i)Database:\s*(\S+)").expect("valid regex");
    let table_re = regex::Regex::new(r"(?i)Table:\s*(\S+)").expect("valid regex");

    let mut found = Vec::new();
    for line in text.lines() {
        if let Some(cap) = db_re.captures(line) {
            found.push(QuickExtract {
                kind: "database".into(),
                value: cap[1].to_string(),
            });
        } else if let Some(cap) = table_re.captures(line) {
            found.push(QuickExtract {
                kind: "table".into(),
                value: cap[1].to_string(),
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_databases_and_tables_from_stdout() {
        let text = "\
[12:00:01] [INFO] fetching database names\n\
Database: dvwa\n\
Database: information_schema\n\
[12:00:02] [INFO] fetching tables\n\
Table: users\n\
nothing here\n";
        let found = extract_from_text(text);
        assert_eq!(
            found,
            vec![
                QuickExtract {
                    kind: "database".into(),
                    value: "dvwa".into()
                },
                QuickExtract {
                    kind: "database".into(),
                    value: "information_schema".into()
                },
                QuickExtract {
                    kind: "table".into(),
                    value: "users".into()
                },
            ]
        );
    }

    #[test]
    fn missing_stdout_file_yields_no_extracts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(best_effort_extract(&dir.path().join("absent.txt")).is_empty());
    }
}
