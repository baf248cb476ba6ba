//! Breakpoint path normalization
//!
//! The IDE hands the adapter absolute source paths; the script runtime
//! keys breakpoints by a project-relative path with a single leading
//! sentinel character. Relative-path resolution is delegated to the
//! asset-path collaborator and fails soft: an unresolvable path is sent
//! prefixed as-is, and the target rejects it as unverified rather than
//! the adapter guessing.

use std::path::{Path, PathBuf};

/// Sentinel prepended to relative breakpoint paths on the wire
pub const PATH_SENTINEL: char = '@';

/// Asset-path collaborator: absolute source path to project-relative key
pub trait AssetPaths: Send {
    /// The project-relative equivalent of an absolute path, if known
    fn relative_product_path(&self, absolute: &str) -> Option<String>;
}

/// Production resolver: strips a configured project root
pub struct ProjectPaths {
    root: Option<PathBuf>,
}

impl ProjectPaths {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl AssetPaths for ProjectPaths {
    fn relative_product_path(&self, absolute: &str) -> Option<String> {
        let root = self.root.as_deref()?;
        let relative = Path::new(absolute).strip_prefix(root).ok()?;

        // Wire paths always use forward slashes
        let mut key = String::new();
        for component in relative.components() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&component.as_os_str().to_string_lossy());
        }
        Some(key)
    }
}

/// Key identifying a breakpoint on the remote wire
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BreakpointKey {
    /// Sentinel-prefixed relative path
    pub path: String,
    /// 1-based line number
    pub line: u32,
}

/// Normalize an absolute source path into a target breakpoint key
///
/// Idempotent: a path that already carries the sentinel prefix passes
/// through unchanged, so re-normalizing a key never doubles the sentinel.
pub fn to_target_key(absolute: &str, line: u32, resolver: &dyn AssetPaths) -> BreakpointKey {
    let relative = resolver
        .relative_product_path(absolute)
        .unwrap_or_else(|| absolute.to_string());

    let path = if relative.starts_with(PATH_SENTINEL) {
        relative
    } else {
        format!("{PATH_SENTINEL}{relative}")
    };

    BreakpointKey { path, line }
}
