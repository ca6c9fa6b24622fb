//! Git-backed cache roots and the sessions that keep them in sync

mod backend;
mod error;
mod git;
mod lock;
mod origin;
mod paths;
mod progress;
mod refs;
mod sync;

#[cfg(test)]
mod fake;
#[cfg(test)]
mod fixtures;

pub use backend::{Backend, HeadTarget, ResolvedRef};
pub use error::{ConfigError, SyncError};
pub use git::{Git2Backend, GitError};
pub use lock::{DEFAULT_LOCK_TIMEOUT, RepoLock, lock_path_for};
pub use origin::{BindKind, Bound, bind};
pub use paths::{CACHE_DIR_ENV, CachePaths, expand_root};
pub use progress::{
    CHECKOUT_TASK, DELTAS_TASK, LogProgress, NoProgress, ProgressSink, ProgressTracker,
    TRANSFER_TASK,
};
pub use refs::{FetchPlan, ORIGIN, RefSpec, is_branch_ref};
pub use sync::{DEFAULT_DEPTH, RepoSync, RootStatus, SyncRequest, ensure_repo};
