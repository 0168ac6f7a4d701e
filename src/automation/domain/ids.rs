//! Identifier and validated scalar types for the automation domain.

use super::AutomationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Positive pull request number assigned by the source-control host.
///
/// The number is the stable external identity of a pull request and the key
/// of its tracking row.
///
/// # Examples
///
///     use prflow::automation::domain::PullRequestNumber;
///
///     let number = PullRequestNumber::new(42).expect("valid");
///     assert_eq!(number.value(), 42);
///     assert!(PullRequestNumber::new(0).is_err());
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationDomainError::InvalidPullRequestNumber`] when the
    /// value is zero.
    pub const fn new(value: u64) -> Result<Self, AutomationDomainError> {
        if value == 0 {
            return Err(AutomationDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Validated branch name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationDomainError::EmptyBranchName`] for blank input and
    /// [`AutomationDomainError::InvalidBranchName`] when the name contains
    /// whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, AutomationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AutomationDomainError::EmptyBranchName);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AutomationDomainError::InvalidBranchName(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the branch name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation identifier for one orchestrated workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowRunId(Uuid);

impl WorkflowRunId {
    /// Creates a new random run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for WorkflowRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
