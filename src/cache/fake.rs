//! In-memory backend for exercising the session state machine.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::backend::{Backend, HeadTarget, ResolvedRef};
use super::git::GitError;
use super::progress::ProgressTracker;
use super::refs::{FetchPlan, ORIGIN};
use crate::types::CommitId;

type Parents = HashMap<CommitId, Option<CommitId>>;

#[derive(Default)]
struct FakeRemote {
    commits: Parents,
    refs: BTreeMap<String, CommitId>,
    next: u64,
}

#[derive(Default)]
struct FakeRepo {
    origin: Option<String>,
    objects: Parents,
    refs: BTreeMap<String, CommitId>,
    head: Option<HeadTarget>,
    worktree: Option<CommitId>,
}

/// A remote plus any number of local cache roots, all in memory.
#[derive(Default)]
pub(crate) struct FakeBackend {
    remote: RefCell<FakeRemote>,
    repos: RefCell<HashMap<PathBuf, FakeRepo>>,
    fetches: RefCell<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit on top of remote branch `branch`.
    pub fn commit(&self, branch: &str) -> CommitId {
        let mut remote = self.remote.borrow_mut();
        remote.next += 1;
        let id: CommitId = format!("{:040x}", remote.next).parse().expect("valid id");
        let name = format!("refs/heads/{}", branch);
        let parent = remote.refs.get(&name).cloned();
        remote.commits.insert(id.clone(), parent);
        remote.refs.insert(name, id.clone());
        id
    }

    /// Point remote tag `name` at `commit`.
    pub fn tag(&self, name: &str, commit: &CommitId) {
        self.remote
            .borrow_mut()
            .refs
            .insert(format!("refs/tags/{}", name), commit.clone());
    }

    /// Create a repository at `path` as if it had been made by someone else.
    pub fn existing_repo(&self, path: &Path, origin: Option<&str>) {
        self.repos.borrow_mut().insert(
            path.to_path_buf(),
            FakeRepo {
                origin: origin.map(str::to_string),
                ..FakeRepo::default()
            },
        );
    }

    pub fn has_repo(&self, path: &Path) -> bool {
        self.repos.borrow().contains_key(path)
    }

    pub fn local_refs(&self, path: &Path) -> Vec<String> {
        self.repos
            .borrow()
            .get(path)
            .map(|r| r.refs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn origin_of(&self, path: &Path) -> Option<String> {
        self.repos.borrow().get(path).and_then(|r| r.origin.clone())
    }

    pub fn head(&self, path: &Path) -> Option<HeadTarget> {
        self.repos.borrow().get(path).and_then(|r| r.head.clone())
    }

    pub fn worktree(&self, path: &Path) -> Option<CommitId> {
        self.repos.borrow().get(path).and_then(|r| r.worktree.clone())
    }

    /// Refspecs fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    fn with_repo<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut FakeRepo) -> Result<T, GitError>,
    ) -> Result<T, GitError> {
        let mut repos = self.repos.borrow_mut();
        let repo = repos
            .get_mut(path)
            .ok_or_else(|| GitError::NotFound(path.display().to_string()))?;
        f(repo)
    }
}

fn not_found(what: &str) -> GitError {
    GitError::NotFound(what.to_string())
}

/// Resolve `name`, `refs/...`, a full commit id, and `~N` / `^` suffixes.
fn resolve_in(repo: &FakeRepo, spec: &str) -> Result<ResolvedRef, GitError> {
    if spec.is_empty() || spec.contains("..") || spec.contains(':') || spec.contains("@{") {
        return Err(not_found(spec));
    }

    let split = spec.find(['~', '^']).unwrap_or(spec.len());
    let (base, mut suffix) = spec.split_at(split);

    let (mut commit, reference) = if base.starts_with("refs/") {
        let commit = repo.refs.get(base).ok_or_else(|| not_found(spec))?;
        (commit.clone(), Some(base.to_string()))
    } else if let Some((name, commit)) = ["refs/heads/", "refs/tags/", "refs/remotes/"]
        .iter()
        .map(|prefix| format!("{}{}", prefix, base))
        .find_map(|name| repo.refs.get(&name).cloned().map(|c| (name, c)))
    {
        (commit, Some(name))
    } else {
        let commit: CommitId = base.parse().map_err(|_| not_found(spec))?;
        if !repo.objects.contains_key(&commit) {
            return Err(not_found(spec));
        }
        (commit, None)
    };

    let has_suffix = !suffix.is_empty();
    while let Some(op) = suffix.chars().next() {
        let rest = &suffix[1..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let count: usize = if digits == 0 {
            1
        } else {
            rest[..digits].parse().map_err(|_| not_found(spec))?
        };
        if op == '^' && count != 1 {
            return Err(not_found(spec));
        }
        for _ in 0..count {
            // Shallow history ends at the first parent we never fetched.
            commit = repo
                .objects
                .get(&commit)
                .cloned()
                .flatten()
                .filter(|parent| repo.objects.contains_key(parent))
                .ok_or_else(|| not_found(spec))?;
        }
        suffix = &rest[digits..];
    }

    Ok(ResolvedRef {
        commit,
        reference: if has_suffix { None } else { reference },
    })
}

impl Backend for FakeBackend {
    type Repo = PathBuf;

    fn open(&self, path: &Path) -> Result<Option<PathBuf>, GitError> {
        Ok(self.has_repo(path).then(|| path.to_path_buf()))
    }

    fn init(&self, path: &Path, origin_url: &str) -> Result<PathBuf, GitError> {
        self.existing_repo(path, Some(origin_url));
        Ok(path.to_path_buf())
    }

    fn remote_url(&self, repo: &PathBuf, name: &str) -> Result<Option<String>, GitError> {
        self.with_repo(repo, |r| {
            Ok(if name == ORIGIN { r.origin.clone() } else { None })
        })
    }

    fn fetch(
        &self,
        repo: &PathBuf,
        remote: &str,
        plan: &FetchPlan,
        depth: u32,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError> {
        self.fetches.borrow_mut().push(plan.refspec());

        let source = self.remote.borrow();
        let tip = source
            .refs
            .get(&plan.source)
            .cloned()
            .ok_or_else(|| not_found(&format!("remote ref {}", plan.source)))?;

        let mut chain = Vec::new();
        let mut next = Some(tip.clone());
        while let Some(id) = next {
            if depth != 0 && chain.len() as u32 == depth {
                break;
            }
            next = source.commits.get(&id).cloned().flatten();
            chain.push(id);
        }

        progress.sideband(&format!(
            "Counting objects: 100% ({0}/{0}), done.\n",
            chain.len()
        ));

        self.with_repo(repo, |r| {
            if r.origin.is_none() || remote != ORIGIN {
                return Err(not_found(remote));
            }
            let total = chain.len() as u64;
            for (i, id) in chain.iter().enumerate() {
                let parent = source.commits.get(id).cloned().flatten();
                r.objects.insert(id.clone(), parent);
                progress.transfer(i as u64 + 1, total);
            }
            r.refs.insert(plan.destination.clone(), tip);
            Ok(())
        })
    }

    fn resolve_reference(&self, repo: &PathBuf, spec: &str) -> Result<ResolvedRef, GitError> {
        self.with_repo(repo, |r| resolve_in(r, spec))
    }

    fn checkout(
        &self,
        repo: &PathBuf,
        commit: &CommitId,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), GitError> {
        self.with_repo(repo, |r| {
            if !r.objects.contains_key(commit) {
                return Err(not_found(commit.as_str()));
            }
            progress.checkout(1, 2);
            progress.checkout(2, 2);
            r.worktree = Some(commit.clone());
            Ok(())
        })
    }

    fn set_head(&self, repo: &PathBuf, target: &HeadTarget) -> Result<(), GitError> {
        self.with_repo(repo, |r| {
            r.head = Some(target.clone());
            Ok(())
        })
    }

    fn head_commit(&self, repo: &PathBuf) -> Result<CommitId, GitError> {
        self.with_repo(repo, |r| match &r.head {
            Some(HeadTarget::Branch(name)) => r.refs.get(name).cloned().ok_or_else(|| not_found(name)),
            Some(HeadTarget::Detached(commit)) => Ok(commit.clone()),
            None => Err(not_found("HEAD")),
        })
    }
}
