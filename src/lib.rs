//! Keep a local working tree of a remote git repository pinned to a ref.
//!
//! ```no_run
//! let commit = reposync::ensure_repo(
//!     "~/.cache/fonts",
//!     "https://github.com/google/fonts.git",
//!     "main",
//!     true,
//!     1,
//! )?;
//! println!("fonts at {}", commit);
//! # Ok::<(), reposync::SyncError>(())
//! ```

pub mod cache;
pub mod types;

pub use cache::{RepoSync, SyncError, SyncRequest, ensure_repo};
pub use types::{CommitId, SyncResult};
