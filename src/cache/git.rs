//! Git operations on libgit2.
//!
//! Every repository primitive the synchronizer needs, including shallow
//! fetches, goes through `git2`; no `git` binary is required.
//!
//! - `open` / `init` - bind a cache root
//! - `fetch` - one explicit refspec, depth-limited, no tag auto-follow
//! - `resolve_reference` - full revparse grammar (`main`, `refs/tags/v1`, `main~1`)
//! - `checkout` / `set_head` - forced checkout, attached or detached HEAD

use std::cell::RefCell;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{AutotagOption, Cred, ErrorCode, FetchOptions, Oid, RemoteCallbacks, Repository};
use thiserror::Error;

use super::backend::{Backend, HeadTarget, ResolvedRef};
use super::progress::ProgressTracker;
use super::refs::{FetchPlan, ORIGIN};
use crate::types::CommitId;

/// Errors returned by git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// libgit2 reported an error.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    /// A repository, remote, ref or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Output parsing or unexpected git data.
    #[error("failed to parse git data: {0}")]
    ParseError(String),
    /// Fetch failed.
    #[error("fetch of {refspec} failed: {source}")]
    FetchError {
        refspec: String,
        #[source]
        source: git2::Error,
    },
}

/// [`Backend`] implementation on libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Backend;

impl Git2Backend {
    /// Create a new backend.
    pub fn new() -> Self {
        Self
    }
}

fn commit_id(oid: Oid) -> Result<CommitId, GitError> {
    oid.to_string()
        .parse()
        .map_err(|e| GitError::ParseError(format!("object id {}: {}", oid, e)))
}

fn parse_oid(commit: &CommitId) -> Result<Oid, GitError> {
    Ok(Oid::from_str(commit.as_str())?)
}

/// Credentials for network remotes: ssh-agent, then the git credential
/// helper, then libgit2's default.
fn remote_callbacks<'a>(repo: &Repository) -> RemoteCallbacks<'a> {
    let config = repo.config().ok();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            if let Some(config) = config.as_ref() {
                if let Ok(cred) = Cred::credential_helper(config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }
        Cred::default()
    });
    callbacks
}

impl Backend for Git2Backend {
    type Repo = Repository;

    fn open(&self, path: &Path) -> Result<Option<Repository>, GitError> {
        match Repository::open(path) {
            Ok(repo) => Ok(Some(repo)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Git(e)),
        }
    }

    fn init(&self, path: &Path, origin_url: &str) -> Result<Repository, GitError> {
        let repo = Repository::init(path)?;
        repo.remote(ORIGIN, origin_url)?;
        Ok(repo)
    }

    fn remote_url(&self, repo: &Repository, name: &str) -> Result<Option<String>, GitError> {
        match repo.find_remote(name) {
            Ok(remote) => match remote.url() {
                Some(url) => Ok(Some(url.to_string())),
                None => Err(GitError::ParseError(format!(
                    "url of remote '{}' is not valid UTF-8",
                    name
                ))),
            },
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Git(e)),
        }
    }

    fn fetch(
        &self,
        repo: &Repository,
        remote: &str,
        plan: &FetchPlan,
        depth: u32,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError> {
        let mut origin = repo.find_remote(remote)?;
        let tracker = RefCell::new(progress);

        let mut callbacks = remote_callbacks(repo);
        callbacks.transfer_progress(|stats| {
            let mut tracker = tracker.borrow_mut();
            tracker.transfer(stats.received_objects() as u64, stats.total_objects() as u64);
            tracker.deltas(stats.indexed_deltas() as u64, stats.total_deltas() as u64);
            true
        });
        callbacks.sideband_progress(|data| {
            tracker
                .borrow_mut()
                .sideband(&String::from_utf8_lossy(data));
            true
        });

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        // Tag auto-follow would write refs the plan does not name.
        options.download_tags(AutotagOption::None);
        options.depth(i32::try_from(depth).unwrap_or(i32::MAX));

        let refspec = plan.refspec();
        origin
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(|source| GitError::FetchError { refspec, source })?;

        // libgit2 skips a refspec whose source the remote does not have.
        let advertised = origin.list()?.iter().any(|head| head.name() == plan.source);
        if !advertised {
            return Err(GitError::NotFound(format!(
                "remote ref {} on {}",
                plan.source, remote
            )));
        }
        Ok(())
    }

    fn resolve_reference(&self, repo: &Repository, spec: &str) -> Result<ResolvedRef, GitError> {
        let (object, reference) = repo.revparse_ext(spec)?;
        let commit = object.peel_to_commit()?;
        Ok(ResolvedRef {
            commit: commit_id(commit.id())?,
            reference: reference.and_then(|r| r.name().map(str::to_string)),
        })
    }

    fn checkout(
        &self,
        repo: &Repository,
        commit: &CommitId,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError> {
        let target = repo.find_commit(parse_oid(commit)?)?;

        let mut builder = CheckoutBuilder::new();
        builder.force();
        builder.progress(|_path, completed, total| {
            progress.checkout(completed as u64, total as u64);
        });

        repo.checkout_tree(target.as_object(), Some(&mut builder))?;
        Ok(())
    }

    fn set_head(&self, repo: &Repository, target: &HeadTarget) -> Result<(), GitError> {
        match target {
            HeadTarget::Branch(name) => repo.set_head(name)?,
            HeadTarget::Detached(commit) => repo.set_head_detached(parse_oid(commit)?)?,
        }
        Ok(())
    }

    fn head_commit(&self, repo: &Repository) -> Result<CommitId, GitError> {
        let head = repo.head().map_err(|e| match e.code() {
            ErrorCode::UnbornBranch | ErrorCode::NotFound => GitError::NotFound("HEAD".into()),
            _ => GitError::Git(e),
        })?;
        let commit = head.peel_to_commit()?;
        commit_id(commit.id())
    }
}
