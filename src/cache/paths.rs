//! Cache directory path management
//!
//! When no explicit root is given, each origin URL gets its own root under
//! the cache directory:
//!
//! ```text
//! ~/.cache/reposync/
//! └── repos/
//!     └── <host>/
//!         └── <path>/        # working tree + .git, bound to one URL
//! ```
//!
//! Local-path origins live under `repos/local/`.

use std::path::{Component, Path, PathBuf};

/// Environment variable overriding the base cache directory.
pub const CACHE_DIR_ENV: &str = "REPOSYNC_CACHE_DIR";

/// Manages filesystem paths for cache roots
#[derive(Debug, Clone)]
pub struct CachePaths {
    base: PathBuf,
}

impl CachePaths {
    /// Creates a new CachePaths with the specified base directory
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base cache directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the repos directory path: `{base}/repos`
    pub fn repos_dir(&self) -> PathBuf {
        self.base.join("repos")
    }

    /// Returns the default cache root for an origin URL.
    ///
    /// `https://github.com/google/fonts.git` and `git@github.com:google/fonts`
    /// both map to `{base}/repos/github.com/google/fonts`.
    pub fn root_for_url(&self, url: &str) -> PathBuf {
        let mut path = self.repos_dir();
        for segment in url_segments(url) {
            path.push(segment);
        }
        path
    }
}

impl Default for CachePaths {
    /// Creates a CachePaths from `$REPOSYNC_CACHE_DIR`, falling back to the
    /// system cache directory + "reposync"
    fn default() -> Self {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Self::new(dir);
        }
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self::new(cache_dir.join("reposync"))
    }
}

/// Expand a leading `~` and make the path absolute.
pub fn expand_root(root: &Path) -> std::io::Result<PathBuf> {
    let expanded = match root.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => root.to_path_buf(),
        },
        Err(_) => root.to_path_buf(),
    };
    std::path::absolute(expanded)
}

fn url_segments(url: &str) -> Vec<String> {
    let (host, path) = split_url(url);

    let mut segments: Vec<String> = Vec::new();
    segments.push(host.map(sanitize).unwrap_or_else(|| "local".to_string()));

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    for component in Path::new(path).components() {
        if let Component::Normal(part) = component {
            let part = sanitize(&part.to_string_lossy());
            if !part.is_empty() {
                segments.push(part);
            }
        }
    }
    segments
}

/// Split into (host, path). Local paths and `file://` URLs have no host.
fn split_url(url: &str) -> (Option<&str>, &str) {
    if let Some(rest) = url.strip_prefix("file://") {
        return (None, rest);
    }
    if let Some((_, rest)) = url.split_once("://") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        return (Some(host), path);
    }
    // scp-like syntax: user@host:path
    if let Some((authority, path)) = url.split_once(':') {
        if !authority.contains('/') && authority.len() > 1 {
            let host = authority.rsplit('@').next().unwrap_or(authority);
            return (Some(host), path);
        }
    }
    (None, url)
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
