//! Binding a cache root to exactly one origin URL.
//!
//! A root is bound when it is first initialized and never rebound. Opening
//! a root is a pure open/validate step: nothing is fetched and no ref moves.

use std::path::Path;

use super::backend::Backend;
use super::error::{ConfigError, SyncError};
use super::refs::ORIGIN;

/// How the repository at the cache root came to be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// A repository already existed and its origin matched.
    Adopted,
    /// The root had no repository and a new one was created.
    Initialized,
}

/// An open repository whose origin is known to be the requested URL.
pub struct Bound<R> {
    pub repo: R,
    pub kind: BindKind,
}

/// Open or initialize the repository at `root`, bound to `url`.
///
/// - no repository, `download == false`: [`SyncError::NotFound`], nothing created
/// - no repository, `download == true`: new repository with `url` as origin
/// - existing repository: origin must exist and equal `url` byte-for-byte
pub fn bind<B: Backend>(
    backend: &B,
    root: &Path,
    url: &str,
    download: bool,
) -> Result<Bound<B::Repo>, SyncError> {
    match backend.open(root)? {
        Some(repo) => adopt(backend, repo, root, url),
        None if !download => Err(SyncError::NotFound(root.to_path_buf())),
        None => {
            let repo = backend.init(root, url)?;
            log::info!("initialized {} with origin {}", root.display(), url);
            Ok(Bound {
                repo,
                kind: BindKind::Initialized,
            })
        }
    }
}

fn adopt<B: Backend>(
    backend: &B,
    repo: B::Repo,
    root: &Path,
    url: &str,
) -> Result<Bound<B::Repo>, SyncError> {
    let bound = backend
        .remote_url(&repo, ORIGIN)?
        .ok_or_else(|| ConfigError::MissingOrigin(root.to_path_buf()))?;

    if bound != url {
        return Err(ConfigError::OriginMismatch {
            path: root.to_path_buf(),
            bound,
            requested: url.to_string(),
        }
        .into());
    }

    log::debug!("adopted {} (origin {})", root.display(), url);
    Ok(Bound {
        repo,
        kind: BindKind::Adopted,
    })
}
