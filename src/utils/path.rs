//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `is_under` - subtree membership on normalized paths

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Lexically resolved (`.` and `..`) if already absolute
/// - Joined with the current directory if relative
///
/// Removed files can no longer be canonicalized, so their parent is
/// canonicalized instead and the file name re-attached. This keeps watcher
/// paths for deleted artifacts comparable with configured roots.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && let Ok(parent) = parent.canonicalize()
    {
        return parent.join(name);
    }

    if path.is_absolute() {
        lexical_clean(path)
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| lexical_clean(&cwd.join(path)))
    }
}

/// Drop `.` and fold `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Check whether `path` lies inside `root` (or is `root` itself).
#[inline]
pub fn is_under(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
