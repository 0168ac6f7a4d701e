//! Pull request records and change descriptions read from source control.

use super::{AutomationDomainError, BranchName, ParseStateError, PullRequestNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of a pull request as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// The pull request accepts further review.
    Open,
    /// The pull request was closed, merged or not.
    Closed,
}

impl PullRequestState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PullRequestState {
    type Error = ParseStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseStateError::new("pull request state", value)),
        }
    }
}

/// Read-only copy of a pull request owned by the source-control host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    number: PullRequestNumber,
    title: String,
    body: String,
    state: PullRequestState,
    merged: bool,
    url: String,
    head: BranchName,
    base: BranchName,
    author: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    labels: BTreeSet<String>,
    requested_reviewers: BTreeSet<String>,
}

impl PullRequestRecord {
    /// Creates an open pull request record with an empty body.
    #[must_use]
    pub fn new(
        number: PullRequestNumber,
        title: impl Into<String>,
        head: BranchName,
        base: BranchName,
        author: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            state: PullRequestState::Open,
            merged: false,
            url: String::new(),
            head,
            base,
            author: author.into(),
            created_at,
            updated_at: created_at,
            labels: BTreeSet::new(),
            requested_reviewers: BTreeSet::new(),
        }
    }

    /// Sets the pull request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the browser URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Adds labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels.extend(labels);
        self
    }

    /// Adds requested reviewers.
    #[must_use]
    pub fn with_requested_reviewers(mut self, reviewers: impl IntoIterator<Item = String>) -> Self {
        self.requested_reviewers.extend(reviewers);
        self
    }

    /// Marks the record closed at `closed_at`, optionally as merged.
    #[must_use]
    pub const fn closed(mut self, merged: bool, closed_at: DateTime<Utc>) -> Self {
        self.state = PullRequestState::Closed;
        self.merged = merged;
        self.updated_at = closed_at;
        self
    }

    pub(crate) fn request_reviewers(
        &mut self,
        reviewers: impl IntoIterator<Item = String>,
        at: DateTime<Utc>,
    ) {
        self.requested_reviewers.extend(reviewers);
        self.updated_at = at;
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PullRequestState {
        self.state
    }

    /// Returns whether the pull request was merged.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        self.merged
    }

    /// Returns the browser URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the head branch.
    #[must_use]
    pub const fn head(&self) -> &BranchName {
        &self.head
    }

    /// Returns the base branch.
    #[must_use]
    pub const fn base(&self) -> &BranchName {
        &self.base
    }

    /// Returns the author identity.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the label set.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns the requested reviewer set.
    #[must_use]
    pub const fn requested_reviewers(&self) -> &BTreeSet<String> {
        &self.requested_reviewers
    }
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// Pull request title.
    pub title: String,
    /// Source branch.
    pub head: BranchName,
    /// Target branch.
    pub base: BranchName,
    /// Body text.
    pub body: String,
    /// Labels to apply on creation.
    pub labels: Vec<String>,
}

impl NewPullRequest {
    /// Creates a validated pull request draft.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        title: impl Into<String>,
        head: BranchName,
        base: BranchName,
        body: impl Into<String>,
        labels: Vec<String>,
    ) -> Result<Self, AutomationDomainError> {
        let raw_title = title.into();
        let trimmed = raw_title.trim();
        if trimmed.is_empty() {
            return Err(AutomationDomainError::EmptyTitle);
        }
        Ok(Self {
            title: trimmed.to_owned(),
            head,
            base,
            body: body.into(),
            labels,
        })
    }
}

/// One file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDelta {
    /// Repository-relative path.
    pub filename: String,
    /// Host change status such as `added`, `modified` or `removed`.
    pub status: String,
    /// Added lines.
    pub additions: u64,
    /// Removed lines.
    pub deletions: u64,
    /// Total changed lines.
    pub changes: u64,
    /// Unified diff for the file, when the host provides one.
    pub patch: Option<String>,
}

impl FileDelta {
    /// Creates a file delta without patch text.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        status: impl Into<String>,
        additions: u64,
        deletions: u64,
    ) -> Self {
        Self {
            filename: filename.into(),
            status: status.into(),
            additions,
            deletions,
            changes: additions.saturating_add(deletions),
            patch: None,
        }
    }

    /// Attaches patch text.
    #[must_use]
    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }
}
