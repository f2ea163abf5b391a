//! Burp Repeater export for saved raw HTTP captures.

use crate::orchestrator::baseline::{REQUEST_MARKER, RESPONSE_MARKER};
use anyhow::{Context, Result};
use std::path::Path;

/// Extract only the request section of a saved `raw_http_<n>.txt` capture and
/// write it verbatim to `out_path`. When the section markers are absent the
/// whole file is exported unchanged.
pub fn export_to_burp(raw_http_path: &Path, out_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(raw_http_path)
        .with_context(|| format!("read {}", raw_http_path.display()))?;
    let content = request_section(&text);
    std::fs::write(out_path, content).with_context(|| format!("write {}", out_path.display()))
}

fn request_section(text: &str) -> &str {
    match text.split_once(REQUEST_MARKER) {
        Some((_, rest)) => match rest.split_once(RESPONSE_MARKER) {
            Some((req, _)) => req.trim(),
            None => rest.trim(),
        },
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_section_is_extracted_between_markers() {
        let text = format!(
            "{REQUEST_MARKER}\nGET /vuln?id=1 HTTP/1.1\nCookie: PHPSESSID=x\n\n{RESPONSE_MARKER}\nHTTP/1.1 200\n"
        );
        assert_eq!(
            request_section(&text),
            "GET /vuln?id=1 HTTP/1.1\nCookie: PHPSESSID=x"
        );
    }

    #[test]
    fn missing_response_marker_keeps_rest_of_file() {
        let text = format!("{REQUEST_MARKER}\nGET / HTTP/1.1\n");
        assert_eq!(request_section(&text), "GET / HTTP/1.1");
    }

    #[test]
    fn missing_markers_export_whole_file() {
        let text = "POST /login HTTP/1.1\nHost: demo\n";
        assert_eq!(request_section(text), text);
    }

    #[test]
    fn exported_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw_http_0.txt");
        let out = dir.path().join("burp_request.txt");
        std::fs::write(
            &raw,
            format!("{REQUEST_MARKER}\nGET /a HTTP/1.1\n\n{RESPONSE_MARKER}\nHTTP/1.1 404\n"),
        )
        .unwrap();

        export_to_burp(&raw, &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "GET /a HTTP/1.1");
    }
}
