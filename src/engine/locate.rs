use std::path::{Path, PathBuf};

/// Reduce a target URL to the bare host token sqlmap keys its output dirs on:
/// strip a leading `scheme://` and anything after the first `/`.
pub fn host_token(target: &str) -> String {
    let host = match target.split_once("://") {
        Some((_, rest)) => rest,
        None => target,
    };
    match host.split_once('/') {
        Some((head, _)) => head.to_string(),
        None => host.to_string(),
    }
}

/// Best-effort mapping from a target to sqlmap's output directory.
///
/// Tries `base/<token>` first, then a sanitized variant (scheme separators,
/// slashes and colons replaced with underscores). When neither exists the raw
/// candidate is still returned; callers must check existence before trusting it.
pub fn locate_output_dir(base: &Path, target: &str) -> PathBuf {
    let token = host_token(target);
    let candidate = base.join(&token);
    if candidate.exists() {
        return candidate;
    }
    let sanitized = token.replace("://", "_").replace(['/', ':'], "_");
    let fallback = base.join(sanitized);
    if fallback.exists() {
        fallback
    } else {
        candidate
    }
}
