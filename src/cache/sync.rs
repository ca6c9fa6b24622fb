//! Synchronization sessions
//!
//! A session runs `bind -> plan -> fetch -> resolve -> checkout` against one
//! cache root and returns the commit HEAD ends up at:
//!
//! 1. Init: reject a negative depth before any IO.
//! 2. Plan: with `download`, turn the ref into a single-ref [`FetchPlan`].
//!    Rejected refs never touch the root.
//! 3. Bind: open or initialize the root (see [`origin`](super::origin)).
//! 4. Fetch: only with `download`; depth-limited, writes only the planned ref.
//! 5. Resolve: the caller's original string, full revparse grammar.
//! 6. Checkout: forced, then HEAD attached to a branch or detached.
//! 7. Done: report HEAD's commit.
//!
//! Sessions against the same root must be serialized by the caller, e.g.
//! with [`RepoLock`](super::RepoLock).

use std::path::{Path, PathBuf};

use super::backend::{Backend, HeadTarget};
use super::error::{ConfigError, SyncError};
use super::git::Git2Backend;
use super::origin::{self, BindKind};
use super::paths::expand_root;
use super::progress::{LogProgress, ProgressSink, ProgressTracker};
use super::refs::{FetchPlan, ORIGIN, RefSpec, is_branch_ref};
use crate::types::{CommitId, SyncResult};

/// Default fetch depth: the tip commit only.
pub const DEFAULT_DEPTH: i32 = 1;

/// Arguments of one synchronization session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Cache root. A leading `~` is expanded.
    pub root: PathBuf,
    /// Origin URL the root is (or will be) bound to.
    pub url: String,
    /// Branch, `refs/...` path, commit id or revision expression.
    pub reference: String,
    /// Allow initializing the root and fetching from the network.
    pub download: bool,
    /// History depth to fetch; 0 is full history.
    pub depth: i32,
}

impl SyncRequest {
    pub fn new(root: impl Into<PathBuf>, url: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url: url.into(),
            reference: reference.into(),
            download: false,
            depth: DEFAULT_DEPTH,
        }
    }

    pub fn download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Depth as handed to the backend; negative depths are rejected.
    pub fn fetch_depth(&self) -> Result<u32, ConfigError> {
        u32::try_from(self.depth).map_err(|_| ConfigError::NegativeDepth(self.depth))
    }

    /// The fetch this request needs, if any. Needs no IO.
    pub fn fetch_plan(&self) -> Result<Option<FetchPlan>, ConfigError> {
        if !self.download {
            return Ok(None);
        }
        FetchPlan::for_spec(&RefSpec::classify(&self.reference)).map(Some)
    }

    /// Reject requests that are invalid whatever the cache root holds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetch_depth()?;
        self.fetch_plan()?;
        Ok(())
    }
}

/// What a cache root currently holds, read without network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootStatus {
    pub root: PathBuf,
    pub origin: Option<String>,
    /// `None` until the first successful checkout.
    pub head: Option<CommitId>,
}

/// Runs synchronization sessions on a [`Backend`].
pub struct RepoSync<B> {
    backend: B,
}

impl Default for RepoSync<Git2Backend> {
    fn default() -> Self {
        Self::new(Git2Backend::new())
    }
}

impl<B: Backend> RepoSync<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Bring `request.root` to `request.reference` and return the commit.
    pub fn sync(
        &self,
        request: &SyncRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<SyncResult, SyncError> {
        let depth = request.fetch_depth()?;
        let plan = request.fetch_plan()?;
        let root = expand_root(&request.root)?;

        let bound = origin::bind(&self.backend, &root, &request.url, request.download)?;
        let repo = bound.repo;
        log::debug!(
            "bound {} ({})",
            root.display(),
            match bound.kind {
                BindKind::Adopted => "adopted",
                BindKind::Initialized => "initialized",
            }
        );

        let mut tracker = ProgressTracker::new(sink);

        if let Some(plan) = &plan {
            let spec = RefSpec::classify(&request.reference);
            if self.is_local_object(&repo, &spec) {
                log::debug!(
                    "{} is already present locally; skipping fetch",
                    request.reference
                );
            } else {
                log::info!(
                    "fetching {} from {} (depth {})",
                    plan,
                    request.url,
                    depth
                );
                self.backend
                    .fetch(&repo, ORIGIN, plan, depth, &mut tracker)?;
            }
        }

        let resolved = self
            .backend
            .resolve_reference(&repo, &request.reference)
            .map_err(|e| {
                log::debug!("resolving {} failed: {}", request.reference, e);
                SyncError::UnresolvableReference {
                    reference: request.reference.clone(),
                    path: root.clone(),
                }
            })?;
        log::debug!(
            "{} resolved to {} via {:?}",
            request.reference,
            resolved.commit,
            resolved.reference
        );

        self.backend
            .checkout(&repo, &resolved.commit, &mut tracker)?;

        let head = match &resolved.reference {
            Some(name) if is_branch_ref(name) => HeadTarget::Branch(name.clone()),
            _ => HeadTarget::Detached(resolved.commit.clone()),
        };
        self.backend.set_head(&repo, &head)?;

        let commit = self.backend.head_commit(&repo)?;
        log::info!("{} is at {}", root.display(), commit);

        Ok(SyncResult {
            commit,
            reference: resolved.reference,
        })
    }

    /// Report the origin and HEAD of an existing root.
    pub fn status(&self, root: &Path) -> Result<RootStatus, SyncError> {
        let root = expand_root(root)?;
        let repo = self
            .backend
            .open(&root)?
            .ok_or_else(|| SyncError::NotFound(root.clone()))?;
        let origin = self.backend.remote_url(&repo, ORIGIN)?;
        // An unborn HEAD just means nothing has been checked out yet.
        let head = self.backend.head_commit(&repo).ok();
        Ok(RootStatus { root, origin, head })
    }

    /// A commit id that already resolves locally without going through a ref.
    ///
    /// Commits are immutable, so there is nothing to fetch for it.
    fn is_local_object(&self, repo: &B::Repo, spec: &RefSpec<'_>) -> bool {
        spec.looks_like_object_id()
            && self
                .backend
                .resolve_reference(repo, spec.as_str())
                .is_ok_and(|r| r.reference.is_none())
    }
}

/// Ensure `root` holds `reference` from `url` and return the commit id.
///
/// Uses libgit2 and reports progress through the `log` facade.
pub fn ensure_repo(
    root: impl AsRef<Path>,
    url: &str,
    reference: &str,
    download: bool,
    depth: i32,
) -> Result<CommitId, SyncError> {
    let request = SyncRequest::new(root.as_ref(), url, reference)
        .download(download)
        .depth(depth);
    let mut progress = LogProgress::default();
    RepoSync::default()
        .sync(&request, &mut progress)
        .map(|result| result.commit)
}
