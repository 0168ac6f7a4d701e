//! Domain model for pull request lifecycle automation.
//!
//! The domain holds branch and pull request snapshots, approval derivation,
//! generated content with its fallbacks, tracking rows, and the structured
//! results returned by the orchestrator. No infrastructure concerns cross
//! this boundary.

mod analysis;
mod approval;
mod branch;
mod content;
mod error;
mod ids;
mod outcome;
mod pull_request;
mod tracking;

pub use analysis::{ChangeAnalysis, ChangeImpact, ClassifiedFile, FileKind};
pub use approval::{
    APPROVED_MARK, ApprovalStatus, DEFAULT_REQUIRED_APPROVALS, ReviewState, ReviewSubmission,
};
pub use branch::BranchSnapshot;
pub use content::{
    AiContent, AiReview, FALLBACK_LABEL, FALLBACK_REVIEW_SCORE, Generated, InlineComment,
    MAX_REVIEW_SCORE, default_description, default_title, normalise_score,
};
pub use error::{AutomationDomainError, ParseStateError};
pub use ids::{BranchName, PullRequestNumber, WorkflowRunId};
pub use outcome::{
    AnalysisResult, AutomationResult, ClearResult, ContentSource, FailureKind, IntegrationOutcome,
    OperationFailure, PendingReviewsResult, PrApproval, PrResult, ReviewResult, StatisticsResult,
    StatusSnapshot, TrackingResult,
};
pub use pull_request::{FileDelta, NewPullRequest, PullRequestRecord, PullRequestState};
pub use tracking::{
    INITIAL_APPROVALS, ReviewStatus, RowHandle, TrackingRow, TrackingStatistics, TrackingUpdate,
};
