//! Version-control primitives the synchronizer is built on.
//!
//! [`Git2Backend`](super::git::Git2Backend) implements these on libgit2.
//! Tests substitute an in-memory implementation so the session state machine
//! can be exercised without a filesystem or network.

use std::path::Path;

use super::git::GitError;
use super::progress::ProgressTracker;
use super::refs::FetchPlan;
use crate::types::CommitId;

/// Result of resolving a ref string against local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// Commit the string peels to.
    pub commit: CommitId,
    /// Full name of the reference the string went through, if it named one.
    pub reference: Option<String>,
}

/// Where HEAD should point after checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTarget {
    /// Attach HEAD to a local branch, e.g. `refs/heads/main`.
    Branch(String),
    /// Detach HEAD at a commit.
    Detached(CommitId),
}

/// The primitives a repository backend must provide.
pub trait Backend {
    /// Open repository handle.
    type Repo;

    /// Open the repository at `path`; `Ok(None)` when there is none.
    fn open(&self, path: &Path) -> Result<Option<Self::Repo>, GitError>;

    /// Create an empty repository at `path` with `origin_url` as origin.
    fn init(&self, path: &Path, origin_url: &str) -> Result<Self::Repo, GitError>;

    /// URL of the remote called `name`; `Ok(None)` when it is not defined.
    fn remote_url(&self, repo: &Self::Repo, name: &str) -> Result<Option<String>, GitError>;

    /// Fetch exactly the ref in `plan` from `remote`.
    ///
    /// `depth` 0 means full history. Only `plan.destination` may be written.
    fn fetch(
        &self,
        repo: &Self::Repo,
        remote: &str,
        plan: &FetchPlan,
        depth: u32,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError>;

    /// Resolve any ref string, including revision expressions.
    fn resolve_reference(&self, repo: &Self::Repo, spec: &str) -> Result<ResolvedRef, GitError>;

    /// Force the working tree to match `commit`, discarding local changes.
    fn checkout(
        &self,
        repo: &Self::Repo,
        commit: &CommitId,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError>;

    /// Point HEAD at `target`.
    fn set_head(&self, repo: &Self::Repo, target: &HeadTarget) -> Result<(), GitError>;

    /// Commit HEAD currently peels to.
    fn head_commit(&self, repo: &Self::Repo) -> Result<CommitId, GitError>;
}
