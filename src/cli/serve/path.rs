//! URL to artifact path resolution.

use std::path::{Path, PathBuf};

use crate::reload::message::ARTIFACT_PREFIX;

/// Map a request URL under [`ARTIFACT_PREFIX`] to a file inside `out_dir`.
///
/// Returns `None` for other URLs, directories, missing files and anything that
/// would escape `out_dir`.
pub fn resolve_path(url: &str, out_dir: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    let relative = clean
        .strip_prefix(ARTIFACT_PREFIX.trim_start_matches('/'))?
        .strip_prefix('/')?;

    // Reject paths with suspicious patterns early
    if relative.is_empty() || relative.split('/').any(|seg| seg == "..") {
        return None;
    }

    // Canonicalize to resolve symlinks and verify path is under out_dir
    let canonical = out_dir.join(relative).canonicalize().ok()?;
    let root_canonical = out_dir.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    canonical.is_file().then_some(canonical)
}

/// Whether the URL asks for a generated artifact at all.
pub fn is_artifact_url(url: &str) -> bool {
    let clean = normalize_url(url);
    let prefix = ARTIFACT_PREFIX.trim_start_matches('/');
    clean == prefix || clean.starts_with(&format!("{prefix}/"))
}

/// Normalize URL: decode, strip query string, trim slashes
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn out_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("engine_bg.wasm"), b"\0asm").unwrap();
        fs::create_dir(dir.path().join("snippets")).unwrap();
        fs::write(dir.path().join("snippets/inline0.js"), b"export {}").unwrap();
        dir
    }

    #[test]
    fn test_resolves_artifacts_under_prefix() {
        let dir = out_dir();
        let resolved = resolve_path("/pkg/engine_bg.wasm?v=3", dir.path()).unwrap();
        assert!(resolved.ends_with("engine_bg.wasm"));

        let nested = resolve_path("/pkg/snippets/inline0.js", dir.path()).unwrap();
        assert!(nested.ends_with("snippets/inline0.js"));
    }

    #[test]
    fn test_rejects_other_urls() {
        let dir = out_dir();
        assert!(resolve_path("/engine_bg.wasm", dir.path()).is_none());
        assert!(resolve_path("/pkg", dir.path()).is_none());
        assert!(resolve_path("/pkg/snippets", dir.path()).is_none());
        assert!(resolve_path("/pkg/missing.js", dir.path()).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = out_dir();
        assert!(resolve_path("/pkg/../engine_bg.wasm", dir.path()).is_none());
        assert!(resolve_path("/pkg/%2e%2e/secret", dir.path()).is_none());
    }

    #[test]
    fn test_is_artifact_url() {
        assert!(is_artifact_url("/pkg/engine.js"));
        assert!(is_artifact_url("/pkg"));
        assert!(!is_artifact_url("/pkgs/engine.js"));
        assert!(!is_artifact_url("/index.html"));
    }
}
