use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Truncation marker appended when a preview hits its line cap.
pub const TRUNCATION_MARKER: &str = "... (truncated preview)";

/// Dump and log artifacts scraped from a sqlmap output directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactBundle {
    pub dump_path: Option<PathBuf>,
    pub dump_preview: Option<String>,
    pub log_path: Option<PathBuf>,
    pub log_preview: Option<String>,
}

/// Scan `dir` for the configured dump file and a log file, producing bounded
/// previews. A missing directory yields an empty bundle, never an error; a
/// failed read of one file becomes an inline error string and does not stop
/// extraction of the other.
pub fn extract(dir: &Path, dump_rel: &str, log_name: &str, max_lines: usize) -> ArtifactBundle {
    let mut bundle = ArtifactBundle::default();
    if !dir.exists() {
        return bundle;
    }

    let dump = dir.join(dump_rel);
    if dump.exists() {
        bundle.dump_preview = Some(read_preview(&dump, max_lines));
        bundle.dump_path = Some(dump);
    }

    if let Some(log) = find_log_file(dir, log_name) {
        bundle.log_preview = Some(read_preview(&log, max_lines));
        bundle.log_path = Some(log);
    }

    bundle
}

/// Look for the fixed-name log first, then fall back to the most recently
/// modified `*.log` file in the directory.
fn find_log_file(dir: &Path, log_name: &str) -> Option<PathBuf> {
    let fixed = dir.join(log_name);
    if fixed.exists() {
        return Some(fixed);
    }

    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .max_by_key(|p| {
            p.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        })
}

/// First `max_lines` lines of a file, undecodable bytes replaced rather than
/// failing. Reads stop at the cap; dump files can be far larger than any
/// preview. Read errors are reported inline in place of the preview.
pub fn read_preview(path: &Path, max_lines: usize) -> String {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => return format!("Unable to read file {}: {e}", path.display()),
    };
    let mut reader = std::io::BufReader::new(file);

    let mut lines: Vec<String> = Vec::with_capacity(max_lines.min(1024));
    let mut buf = Vec::new();
    let mut truncated = false;
    loop {
        if lines.len() == max_lines {
            truncated = true;
            break;
        }
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                lines.push(line.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => return format!("Unable to read file {}: {e}", path.display()),
        }
    }
    let mut out = lines.join("\n");
    if truncated {
        out.push('\n');
        out.push_str(TRUNCATION_MARKER);
    }
    out
}
