//! Source-control host port: branches, pull requests, comments and reviews.

use crate::automation::domain::{
    ApprovalStatus, BranchName, BranchSnapshot, FileDelta, InlineComment, NewPullRequest,
    PullRequestNumber, PullRequestRecord,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for source-control operations.
pub type SourceControlResult<T> = Result<T, SourceControlError>;

/// Source-control host contract consumed by the orchestrator.
///
/// Lookups that may legitimately miss return `Ok(None)`; every other
/// absence is reported as [`SourceControlError::PullRequestNotFound`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceControlClient: Send + Sync {
    /// Reads a snapshot of the named branch.
    async fn get_branch(&self, name: &BranchName) -> SourceControlResult<Option<BranchSnapshot>>;

    /// Opens a pull request.
    async fn create_pull_request(
        &self,
        draft: &NewPullRequest,
    ) -> SourceControlResult<PullRequestRecord>;

    /// Reads a pull request by number.
    async fn get_pull_request(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<Option<PullRequestRecord>>;

    /// Lists open pull requests.
    async fn list_open_pull_requests(&self) -> SourceControlResult<Vec<PullRequestRecord>>;

    /// Lists open and closed pull requests.
    async fn list_all_pull_requests(&self) -> SourceControlResult<Vec<PullRequestRecord>>;

    /// Lists the files changed by a pull request.
    async fn get_changed_files(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<Vec<FileDelta>>;

    /// Posts one review comment.
    async fn add_inline_comment(
        &self,
        number: PullRequestNumber,
        comment: &InlineComment,
    ) -> SourceControlResult<()>;

    /// Derives the current approval status from review history and branch
    /// protection.
    async fn get_approval_status(
        &self,
        number: PullRequestNumber,
    ) -> SourceControlResult<ApprovalStatus>;

    /// Lists identities with access to the repository, the only valid
    /// review requestees.
    async fn list_collaborators(&self) -> SourceControlResult<Vec<String>>;

    /// Requests reviews from the given identities.
    async fn request_reviewers(
        &self,
        number: PullRequestNumber,
        reviewers: &[String],
    ) -> SourceControlResult<()>;

    /// Integrates a pull request without human review.
    async fn auto_integrate(&self, number: PullRequestNumber) -> SourceControlResult<()>;

    /// Publishes a computed approval status back to the host.
    async fn publish_approval_status(
        &self,
        number: PullRequestNumber,
        status: &ApprovalStatus,
    ) -> SourceControlResult<()>;
}

/// Errors returned by source-control adapters.
#[derive(Debug, Clone, Error)]
pub enum SourceControlError {
    /// The pull request does not exist.
    #[error("pull request {0} not found")]
    PullRequestNotFound(PullRequestNumber),

    /// The host refused the write, e.g. an author approving their own pull
    /// request.
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// Operation that was refused.
        operation: &'static str,
        /// Host message, preserved verbatim.
        message: String,
    },

    /// Transport or protocol failure.
    #[error("source control transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl SourceControlError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Creates a rejection carrying the host's message.
    pub fn rejected(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            message: message.into(),
        }
    }
}
