//! Shared types for reposync

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Error type for parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("value cannot be empty")]
    Empty,
    #[error("invalid character in value: {0}")]
    InvalidCharacter(char),
    #[error("object id must be 40 or 64 hex digits, got {0}")]
    InvalidLength(usize),
}

/// A content-addressed commit identifier (SHA-1 or SHA-256 hex)
///
/// Validation rules:
/// - Non-empty
/// - Exactly 40 or 64 characters
/// - Hex digits only, stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Returns the commit id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` characters, for display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl FromStr for CommitId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        for c in s.chars() {
            if !c.is_ascii_hexdigit() {
                return Err(ParseError::InvalidCharacter(c));
            }
        }

        if s.len() != 40 && s.len() != 64 {
            return Err(ParseError::InvalidLength(s.len()));
        }

        Ok(CommitId(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one synchronization session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Commit the working tree was checked out at.
    pub commit: CommitId,
    /// Full reference name the request resolved through, if any.
    ///
    /// `None` when the request named a commit directly or used a revision
    /// expression such as `main~1`.
    pub reference: Option<String>,
}
