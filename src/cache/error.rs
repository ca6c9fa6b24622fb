//! Error taxonomy for cache synchronization.

use std::path::PathBuf;
use thiserror::Error;

use super::git::GitError;

/// Reasons a request is rejected as invalid configuration.
///
/// None of these are retried; each is raised before the commit-producing
/// step of a session.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Fetch depth was below zero.
    #[error("depth must be >= 0, got {0}")]
    NegativeDepth(i32),
    /// The cache root is already bound to a different origin.
    #[error(
        "{path} is bound to remote '{bound}', not '{requested}'; use a separate root per repository"
    )]
    OriginMismatch {
        path: PathBuf,
        bound: String,
        requested: String,
    },
    /// An existing repository at the cache root has no origin remote.
    #[error("existing repository at {0} does not define 'origin'; refusing to adopt it")]
    MissingOrigin(PathBuf),
    /// A remote-tracking ref was requested together with a fetch.
    #[error(
        "Remote-tracking ref '{0}' is not supported with download=true; pass a branch such as 'main' or an explicit refs/... path"
    )]
    RemoteTrackingRef(String),
    /// A revision expression was requested together with a fetch.
    #[error(
        "revision expression '{0}' is not supported with download=true; fetch the branch first, then resolve it with download=false"
    )]
    RevisionExpression(String),
    /// The ref string cannot name a fetchable ref at all.
    #[error("invalid ref '{value}': {reason}")]
    InvalidRef { value: String, reason: &'static str },
}

/// Errors returned by a synchronization session.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No repository at the root and downloading was not allowed.
    #[error("no repository found at {0}; pass download=true to clone it")]
    NotFound(PathBuf),
    /// The request is inconsistent with the cache root or the ref grammar.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// The ref could not be located after all applicable steps.
    #[error("Unable to resolve ref '{reference}' in {path}")]
    UnresolvableReference { reference: String, path: PathBuf },
    /// The version-control backend failed.
    #[error("git error: {0}")]
    Backend(#[from] GitError),
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to acquire the cache root lock within the timeout.
    #[error("lock acquisition failed")]
    LockFailed,
}

impl SyncError {
    /// Whether retrying with `download=true` may succeed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}
