//! Real git repositories for tests.

use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, Signature};

/// A bare repository standing in for the remote, with `main` as HEAD.
pub(crate) struct Origin {
    repo: Repository,
    path: PathBuf,
}

impl Origin {
    pub fn new(dir: &Path) -> Self {
        let path = dir.join("origin.git");
        let repo = Repository::init_bare(&path).expect("Failed to init origin");
        repo.set_head("refs/heads/main")
            .expect("Failed to point origin HEAD at main");
        Self { repo, path }
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn signature() -> Signature<'static> {
        Signature::now("reposync tests", "tests@reposync.dev").expect("signature")
    }

    /// Commit `content` as `name` on top of `main` and return the commit id.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> String {
        let blob = self.repo.blob(content.as_bytes()).expect("blob");
        let parent: Option<Commit<'_>> = self
            .repo
            .find_reference("refs/heads/main")
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let base = parent.as_ref().map(|c| c.tree().expect("parent tree"));

        let mut builder = self.repo.treebuilder(base.as_ref()).expect("treebuilder");
        builder.insert(name, blob, 0o100644).expect("insert");
        let tree = self
            .repo
            .find_tree(builder.write().expect("write tree"))
            .expect("find tree");

        let sig = Self::signature();
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some("refs/heads/main"), &sig, &sig, message, &tree, &parents)
            .expect("commit")
            .to_string()
    }

    pub fn branch(&self, name: &str, commit: &str) {
        let commit = self
            .repo
            .find_commit(Oid::from_str(commit).expect("oid"))
            .expect("find commit");
        self.repo.branch(name, &commit, false).expect("branch");
    }

    pub fn delete_branch(&self, name: &str) {
        self.repo
            .find_reference(&format!("refs/heads/{}", name))
            .expect("find branch")
            .delete()
            .expect("delete branch");
    }

    /// Create an annotated tag.
    pub fn tag(&self, name: &str, commit: &str) {
        let target = self
            .repo
            .find_object(Oid::from_str(commit).expect("oid"), None)
            .expect("find object");
        self.repo
            .tag(name, &target, &Self::signature(), name, false)
            .expect("tag");
    }
}
