//! Structured results returned at the orchestrator's operation boundary.
//!
//! Every public operation reports failure through these values instead of
//! returning `Err`, so callers such as the scheduler or a presentation layer
//! can serialise outcomes directly.

use super::{
    ApprovalStatus, ChangeAnalysis, ClassifiedFile, PullRequestNumber, TrackingStatistics,
    WorkflowRunId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A branch or pull request does not exist.
    NotFound,
    /// Caller input or host data failed validation.
    InvalidInput,
    /// The source-control host rejected or failed a call.
    RemoteWrite,
    /// The tracking store rejected or failed a call.
    Tracking,
}

/// A failed operation's category and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable cause, preserving any host message.
    pub message: String,
}

impl OperationFailure {
    /// Creates a failure.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Where a created pull request's metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// The caller supplied a title and no prompt; nothing was generated.
    Supplied,
    /// The completion service produced the metadata.
    Generated,
    /// Generation failed and the deterministic fallback was used.
    Fallback,
}

/// What happened on the automatic integration path during creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntegrationOutcome {
    /// Integration was not attempted.
    NotAttempted,
    /// The host integrated the pull request.
    Integrated,
    /// The host refused or failed; creation still stands.
    Failed {
        /// Host message.
        reason: String,
    },
}

/// Result of creating a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrResult {
    /// Whether the pull request was created and tracked.
    pub success: bool,
    /// Number assigned by the host.
    pub pr_number: Option<PullRequestNumber>,
    /// Title used.
    pub title: Option<String>,
    /// Browser URL.
    pub url: Option<String>,
    /// Description used.
    pub description: Option<String>,
    /// Reviewers requested.
    pub reviewers: Vec<String>,
    /// Origin of the title and description.
    pub content_source: Option<ContentSource>,
    /// Automatic integration outcome.
    pub integration: IntegrationOutcome,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

impl PrResult {
    /// Creates a failed result.
    #[must_use]
    pub const fn failed(error: OperationFailure) -> Self {
        Self {
            success: false,
            pr_number: None,
            title: None,
            url: None,
            description: None,
            reviewers: Vec::new(),
            content_source: None,
            integration: IntegrationOutcome::NotAttempted,
            error: Some(error),
        }
    }
}

/// Result of analysing a pull request's changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Whether the analysis completed.
    pub success: bool,
    /// Pull request analysed.
    pub pr_number: Option<PullRequestNumber>,
    /// Changed files with their categories.
    pub files: Vec<ClassifiedFile>,
    /// Generated or fallback assessment.
    pub analysis: Option<ChangeAnalysis>,
    /// Whether the fallback assessment was used.
    pub used_fallback: bool,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

impl AnalysisResult {
    /// Creates a failed result.
    #[must_use]
    pub const fn failed(error: OperationFailure) -> Self {
        Self {
            success: false,
            pr_number: None,
            files: Vec::new(),
            analysis: None,
            used_fallback: false,
            error: Some(error),
        }
    }
}

/// Result of reviewing one or more pull requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Whether the operation completed.
    pub success: bool,
    /// Pull requests reviewed successfully.
    pub reviewed_count: u32,
    /// Inline comments actually posted.
    pub comments_count: u32,
    /// Review summary for single-PR reviews.
    pub summary: Option<String>,
    /// Review score for single-PR reviews.
    pub score: Option<f64>,
    /// Whether the fallback review was used for a single-PR review.
    pub used_fallback: bool,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

impl ReviewResult {
    /// Creates a batch result.
    #[must_use]
    pub const fn batch(reviewed_count: u32, comments_count: u32) -> Self {
        Self {
            success: true,
            reviewed_count,
            comments_count,
            summary: None,
            score: None,
            used_fallback: false,
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub const fn failed(error: OperationFailure) -> Self {
        Self {
            success: false,
            reviewed_count: 0,
            comments_count: 0,
            summary: None,
            score: None,
            used_fallback: false,
            error: Some(error),
        }
    }
}

/// Approval status computed for one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrApproval {
    /// Pull request number.
    pub pr_number: PullRequestNumber,
    /// Computed status.
    pub status: ApprovalStatus,
}

/// Result of an approval tracking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResult {
    /// Whether every pull request was processed.
    pub success: bool,
    /// Pull requests processed before completion or abort.
    pub tracked_count: u32,
    /// Tracking rows written.
    pub rows_updated: u32,
    /// Statuses computed, in processing order.
    pub approvals: Vec<PrApproval>,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

impl TrackingResult {
    /// Creates a failed result.
    #[must_use]
    pub const fn failed(error: OperationFailure) -> Self {
        Self {
            success: false,
            tracked_count: 0,
            rows_updated: 0,
            approvals: Vec::new(),
            error: Some(error),
        }
    }
}

/// Result of one review-then-track workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationResult {
    /// Correlation identifier of the run.
    pub run_id: WorkflowRunId,
    /// Whether both stages succeeded.
    pub success: bool,
    /// Short outcome description.
    pub message: String,
    /// Review stage result.
    pub reviews: ReviewResult,
    /// Tracking stage result.
    pub tracking: TrackingResult,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Run end time.
    pub finished_at: DateTime<Utc>,
}

/// Snapshot of the automation's view of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Open pull requests.
    pub open_prs: u32,
    /// Open pull requests still short of required approvals.
    pub pending_reviews: u32,
    /// Whether the tracking store answered.
    pub tracking_connected: bool,
    /// Completion model in use.
    pub ai_model: String,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Failure details when the snapshot is incomplete.
    pub error: Option<OperationFailure>,
}

/// Result of clearing the tracking store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResult {
    /// Whether the store was cleared.
    pub success: bool,
    /// Rows removed.
    pub rows_cleared: u32,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

/// Open pull requests still short of their required approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReviewsResult {
    /// Whether every open pull request was inspected.
    pub success: bool,
    /// Pending pull requests with their current status.
    pub pending: Vec<PrApproval>,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}

/// Aggregates over the tracking store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsResult {
    /// Whether the store could be read.
    pub success: bool,
    /// Computed totals; all zero on failure.
    pub statistics: TrackingStatistics,
    /// Failure details when `success` is false.
    pub error: Option<OperationFailure>,
}
