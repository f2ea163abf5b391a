use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default relative path of the dump file scraped after a run.
pub const DEFAULT_DUMP_REL: &str = "dump/dvwa/users.csv";
/// Default fixed log filename inside a sqlmap output directory.
pub const DEFAULT_LOG_NAME: &str = "log";
/// Default line cap for file previews.
pub const DEFAULT_PREVIEW_LINES: usize = 400;

/// Cookie pair persisted for DVWA-style targets and attached to baseline
/// requests and sqlmap runs by the orchestrate flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cookies {
    #[serde(rename = "PHPSESSID")]
    pub phpsessid: String,
    pub security: String,
}

impl Cookies {
    /// Render as a `Cookie:` header value.
    pub fn header_value(&self) -> String {
        format!("PHPSESSID={}; security={}", self.phpsessid, self.security)
    }
}

/// On-disk panel configuration. Absent or malformed files degrade to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Overrides the default sqlmap output root.
    #[serde(default)]
    pub sqlmap_output_base: Option<PathBuf>,
    /// Program name or full path when sqlmap is not on PATH.
    #[serde(default)]
    pub sqlmap_path: Option<String>,
    #[serde(default)]
    pub cookies: Option<Cookies>,
}

impl PanelConfig {
    /// Load from `path`; missing or corrupt files yield the default config.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }

    /// Resolved sqlmap output root: the configured override or the stock
    /// `~/.local/share/sqlmap/output` location.
    pub fn output_base(&self) -> PathBuf {
        self.sqlmap_output_base
            .clone()
            .unwrap_or_else(default_output_base)
    }

    pub fn sqlmap_program(&self) -> String {
        self.sqlmap_path.clone().unwrap_or_else(|| "sqlmap".into())
    }
}

fn default_output_base() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlmap")
        .join("output")
}

/// Default location of the panel config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlmap-panel")
        .join("config.json")
}
