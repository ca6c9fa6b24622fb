//! Ref classification and fetch planning.
//!
//! A caller-supplied ref string falls into exactly one of four shapes. Only
//! two of them can be fetched directly: a bare branch name and an explicit
//! `refs/...` path. Remote-tracking refs and revision expressions are
//! accepted by local resolution but rejected when a fetch is requested.

use std::fmt;

use super::error::ConfigError;

/// Name of the single remote a cache root is bound to.
pub const ORIGIN: &str = "origin";

const REMOTE_TRACKING_PREFIX: &str = "refs/remotes/";
const REF_PREFIX: &str = "refs/";
const BRANCH_PREFIX: &str = "refs/heads/";

/// Substrings that make a ref string relative to history rather than a name.
const REVISION_OPERATORS: [&str; 5] = ["~", "^", ":", "..", "@{"];

/// Classification of a ref string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSpec<'a> {
    /// A bare name such as `main`.
    LocalBranch(&'a str),
    /// An explicit path such as `refs/tags/v1`.
    FullRef(&'a str),
    /// `origin/main` or `refs/remotes/origin/main`.
    RemoteTracking(&'a str),
    /// Uses relative-history operators, e.g. `main~1` or `HEAD^`.
    Revision(&'a str),
}

impl<'a> RefSpec<'a> {
    /// Classify a ref string. Pure; looks at nothing but the string.
    pub fn classify(value: &'a str) -> Self {
        let remote_shorthand = value
            .strip_prefix(ORIGIN)
            .is_some_and(|rest| rest.starts_with('/'));

        if value.starts_with(REMOTE_TRACKING_PREFIX) || remote_shorthand {
            RefSpec::RemoteTracking(value)
        } else if REVISION_OPERATORS.iter().any(|op| value.contains(op)) {
            RefSpec::Revision(value)
        } else if value.starts_with(REF_PREFIX) {
            RefSpec::FullRef(value)
        } else {
            RefSpec::LocalBranch(value)
        }
    }

    /// The original ref string.
    pub fn as_str(&self) -> &'a str {
        match self {
            RefSpec::LocalBranch(s)
            | RefSpec::FullRef(s)
            | RefSpec::RemoteTracking(s)
            | RefSpec::Revision(s) => s,
        }
    }

    /// Whether the string could be an abbreviated or full object id.
    pub fn looks_like_object_id(&self) -> bool {
        match self {
            RefSpec::LocalBranch(s) => {
                (7..=64).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
            }
            _ => false,
        }
    }
}

/// A single explicit refspec pinning one remote ref to the same local ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    /// Ref on the remote.
    pub source: String,
    /// Local ref that is updated to the fetched value.
    pub destination: String,
    /// Update the local ref even when it does not fast-forward.
    pub force: bool,
}

impl FetchPlan {
    /// Build the fetch plan for a classified ref, or reject it.
    pub fn for_spec(spec: &RefSpec<'_>) -> Result<Self, ConfigError> {
        validate_git_ref(spec.as_str())?;

        let name = match spec {
            RefSpec::RemoteTracking(s) => {
                return Err(ConfigError::RemoteTrackingRef((*s).to_string()));
            }
            RefSpec::Revision(s) => {
                return Err(ConfigError::RevisionExpression((*s).to_string()));
            }
            RefSpec::FullRef(s) => (*s).to_string(),
            RefSpec::LocalBranch(s) => format!("{BRANCH_PREFIX}{s}"),
        };

        Ok(Self {
            source: name.clone(),
            destination: name,
            force: true,
        })
    }

    /// Render as a refspec string, e.g. `+refs/heads/main:refs/heads/main`.
    pub fn refspec(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let force = if self.force { "+" } else { "" };
        write!(f, "{}{}:{}", force, self.source, self.destination)
    }
}

/// Whether a full ref name is a local branch.
pub fn is_branch_ref(name: &str) -> bool {
    name.starts_with(BRANCH_PREFIX)
}

/// Validate that a ref string can be used in a refspec.
///
/// Rejects:
/// - Empty strings
/// - Strings starting with `-` (could be interpreted as flags)
/// - Strings containing null bytes, control characters, or whitespace
/// - Glob characters, which would widen the fetch beyond one ref
/// - A trailing `/` or a trailing `.lock`
fn validate_git_ref(value: &str) -> Result<(), ConfigError> {
    let reject = |reason| {
        Err(ConfigError::InvalidRef {
            value: value.to_string(),
            reason,
        })
    };

    if value.is_empty() {
        return reject("cannot be empty");
    }
    if value.starts_with('-') {
        return reject("cannot start with '-'");
    }
    if value.bytes().any(|b| b < 0x20 || b == 0x7f || b == b' ') {
        return reject("cannot contain whitespace or control characters");
    }
    if value.contains(['*', '?', '[', '\\']) {
        return reject("cannot contain glob characters");
    }
    if value.ends_with('/') || value.ends_with(".lock") {
        return reject("cannot end with '/' or '.lock'");
    }
    Ok(())
}
