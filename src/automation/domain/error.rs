//! Error types for automation domain validation.

use thiserror::Error;

/// Errors returned while constructing automation domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationDomainError {
    /// The pull request number is zero.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// The branch name is empty after trimming.
    #[error("branch name must not be empty")]
    EmptyBranchName,

    /// The branch name contains whitespace.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// The pull request title is empty after trimming.
    #[error("pull request title must not be empty")]
    EmptyTitle,
}

/// Error returned while parsing stored enumerations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseStateError {
    /// Which enumeration failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseStateError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
