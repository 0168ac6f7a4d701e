//! Pull request lifecycle orchestration.
//!
//! [`PrAutomationService`] sequences source-control, generation and tracking
//! calls for each operation. Public operations never return `Err`; failures
//! are reported on the returned result values.

use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::automation::{
    domain::{
        AiContent, AnalysisResult, ApprovalStatus, AutomationDomainError, AutomationResult,
        BranchName, ClassifiedFile, ClearResult, ContentSource, FailureKind, INITIAL_APPROVALS,
        InlineComment, IntegrationOutcome, NewPullRequest, OperationFailure, PendingReviewsResult,
        PrApproval, PrResult, PullRequestNumber, PullRequestRecord, PullRequestState, ReviewResult,
        ReviewStatus, StatisticsResult, StatusSnapshot, TrackingResult, TrackingStatistics,
        TrackingUpdate, WorkflowRunId,
    },
    ports::{
        ContentGenerator, SourceControlClient, SourceControlError, TrackingStore,
        TrackingStoreError,
    },
};

/// What happens to a new pull request that has no reviewers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewerPolicy {
    /// Integrate it immediately.
    #[default]
    AutoIntegrateUnreviewed,
    /// Leave it open for manual handling.
    LeavePending,
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationSettings {
    repository: String,
    reviewer_policy: ReviewerPolicy,
    tracking_sync: bool,
}

impl AutomationSettings {
    /// Creates settings for `repository` in `owner/repo` form.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            reviewer_policy: ReviewerPolicy::default(),
            tracking_sync: true,
        }
    }

    /// Sets the policy for pull requests created without reviewers.
    #[must_use]
    pub const fn with_reviewer_policy(mut self, reviewer_policy: ReviewerPolicy) -> Self {
        self.reviewer_policy = reviewer_policy;
        self
    }

    /// Sets whether workflow runs sync approval state into the tracking
    /// store. Enabled by default.
    #[must_use]
    pub const fn with_tracking_sync(mut self, tracking_sync: bool) -> Self {
        self.tracking_sync = tracking_sync;
        self
    }

    /// Returns the repository.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the reviewer policy.
    #[must_use]
    pub const fn reviewer_policy(&self) -> ReviewerPolicy {
        self.reviewer_policy
    }

    /// Returns whether workflow runs sync the tracking store.
    #[must_use]
    pub const fn tracking_sync(&self) -> bool {
        self.tracking_sync
    }
}

/// Request payload for opening a pull request from a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestRequest {
    branch: String,
    base_branch: String,
    title: Option<String>,
    prompt: Option<String>,
    labels: Vec<String>,
    reviewers: Vec<String>,
    auto_merge: bool,
}

impl CreatePullRequestRequest {
    /// Creates a request to merge `branch` into `base_branch`.
    #[must_use]
    pub fn new(branch: impl Into<String>, base_branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            base_branch: base_branch.into(),
            title: None,
            prompt: None,
            labels: Vec::new(),
            reviewers: Vec::new(),
            auto_merge: false,
        }
    }

    /// Sets an explicit title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets a custom generation prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets labels that replace generated ones.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Sets reviewers that replace generated ones.
    #[must_use]
    pub fn with_reviewers(mut self, reviewers: impl IntoIterator<Item = String>) -> Self {
        self.reviewers = reviewers.into_iter().collect();
        self
    }

    /// Requests best-effort integration after reviewer assignment.
    #[must_use]
    pub const fn with_auto_merge(mut self, auto_merge: bool) -> Self {
        self.auto_merge = auto_merge;
        self
    }

    fn needs_generation(&self) -> bool {
        self.prompt.is_some()
            || self
                .title
                .as_deref()
                .is_none_or(|title| title.trim().is_empty())
    }
}

/// Internal failures of orchestrated operations.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// The head branch does not exist.
    #[error("branch {0} not found")]
    BranchNotFound(BranchName),

    /// The pull request does not exist.
    #[error("pull request {0} not found")]
    PullRequestNotFound(PullRequestNumber),

    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] AutomationDomainError),

    /// The source-control host failed.
    #[error(transparent)]
    SourceControl(#[from] SourceControlError),

    /// The tracking store failed.
    #[error(transparent)]
    Tracking(#[from] TrackingStoreError),
}

impl AutomationError {
    /// Maps the error onto the caller-facing failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::BranchNotFound(_)
            | Self::PullRequestNotFound(_)
            | Self::SourceControl(SourceControlError::PullRequestNotFound(_)) => {
                FailureKind::NotFound
            }
            Self::Domain(_) => FailureKind::InvalidInput,
            Self::SourceControl(_) => FailureKind::RemoteWrite,
            Self::Tracking(_) => FailureKind::Tracking,
        }
    }
}

impl From<&AutomationError> for OperationFailure {
    fn from(err: &AutomationError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

type ServiceResult<T> = Result<T, AutomationError>;

/// Pull request lifecycle orchestrator.
pub struct PrAutomationService<S, G, T, C>
where
    S: SourceControlClient,
    G: ContentGenerator,
    T: TrackingStore,
    C: Clock + Send + Sync,
{
    source_control: Arc<S>,
    generator: Arc<G>,
    tracking: Arc<T>,
    clock: Arc<C>,
    settings: AutomationSettings,
}

impl<S, G, T, C> PrAutomationService<S, G, T, C>
where
    S: SourceControlClient,
    G: ContentGenerator,
    T: TrackingStore,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub const fn new(
        source_control: Arc<S>,
        generator: Arc<G>,
        tracking: Arc<T>,
        clock: Arc<C>,
        settings: AutomationSettings,
    ) -> Self {
        Self {
            source_control,
            generator,
            tracking,
            clock,
            settings,
        }
    }

    /// Returns the orchestrator settings.
    #[must_use]
    pub const fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    /// Opens a pull request for a branch, generating metadata when needed,
    /// assigning reviewers or integrating it, and tracking it.
    ///
    /// A pull request that was opened before a later step failed is left in
    /// place; the result reports the failure.
    pub async fn create_pull_request(&self, request: CreatePullRequestRequest) -> PrResult {
        info!(branch = %request.branch, base = %request.base_branch, "creating pull request");
        match self.try_create_pull_request(request).await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "pull request creation failed");
                PrResult::failed(OperationFailure::from(&err))
            }
        }
    }

    /// Reviews one pull request and optionally posts its inline comments.
    pub async fn review_pull_request(
        &self,
        number: PullRequestNumber,
        auto_comment: bool,
    ) -> ReviewResult {
        info!(pr = %number, auto_comment, "reviewing pull request");
        match self.try_review_pull_request(number, auto_comment).await {
            Ok(result) => result,
            Err(err) => {
                error!(pr = %number, error = %err, "pull request review failed");
                ReviewResult::failed(OperationFailure::from(&err))
            }
        }
    }

    /// Reviews every open pull request in sequence.
    ///
    /// A pull request whose review fails is skipped without aborting the
    /// batch.
    pub async fn review_all_open(&self, auto_comment: bool) -> ReviewResult {
        let open = match self.source_control.list_open_pull_requests().await {
            Ok(open) => open,
            Err(source) => {
                let err = AutomationError::from(source);
                error!(error = %err, "listing open pull requests failed");
                return ReviewResult::failed(OperationFailure::from(&err));
            }
        };
        info!(count = open.len(), "reviewing open pull requests");

        let mut reviewed = 0_u32;
        let mut comments = 0_u32;
        for pull_request in &open {
            let result = self
                .review_pull_request(pull_request.number(), auto_comment)
                .await;
            if result.success {
                reviewed = reviewed.saturating_add(1);
                comments = comments.saturating_add(result.comments_count);
            }
        }
        ReviewResult::batch(reviewed, comments)
    }

    /// Classifies a pull request's changed files and assesses their impact.
    pub async fn analyze_pull_request(&self, number: PullRequestNumber) -> AnalysisResult {
        match self.try_analyze_pull_request(number).await {
            Ok(result) => result,
            Err(err) => {
                error!(pr = %number, error = %err, "change analysis failed");
                AnalysisResult::failed(OperationFailure::from(&err))
            }
        }
    }

    /// Computes approval status for every pull request, optionally
    /// publishing it to the host and syncing it into the tracking store.
    ///
    /// The first failure aborts the pass; counts reached so far are kept on
    /// the result.
    pub async fn track_approvals(
        &self,
        sync_tracking: bool,
        publish_status: bool,
    ) -> TrackingResult {
        info!(sync_tracking, publish_status, "tracking approvals");
        let pull_requests = match self.source_control.list_all_pull_requests().await {
            Ok(pull_requests) => pull_requests,
            Err(source) => {
                let err = AutomationError::from(source);
                error!(error = %err, "listing pull requests failed");
                return TrackingResult::failed(OperationFailure::from(&err));
            }
        };

        let mut result = TrackingResult {
            success: true,
            tracked_count: 0,
            rows_updated: 0,
            approvals: Vec::with_capacity(pull_requests.len()),
            error: None,
        };
        for pull_request in &pull_requests {
            match self
                .track_one(pull_request, sync_tracking, publish_status)
                .await
            {
                Ok((status, row_written)) => {
                    result.tracked_count = result.tracked_count.saturating_add(1);
                    if row_written {
                        result.rows_updated = result.rows_updated.saturating_add(1);
                    }
                    result.approvals.push(PrApproval {
                        pr_number: pull_request.number(),
                        status,
                    });
                }
                Err(err) => {
                    error!(pr = %pull_request.number(), error = %err, "approval tracking aborted");
                    result.success = false;
                    result.error = Some(OperationFailure::from(&err));
                    return result;
                }
            }
        }
        result
    }

    /// Reviews all open pull requests with comments, then tracks approvals
    /// with publishing enabled and syncing as configured.
    pub async fn run_single_workflow(&self) -> AutomationResult {
        let run_id = WorkflowRunId::new();
        let started_at = self.clock.utc();
        info!(run = %run_id, "workflow run started");

        let reviews = self.review_all_open(true).await;
        let tracking = self
            .track_approvals(self.settings.tracking_sync, true)
            .await;
        let success = reviews.success && tracking.success;
        let message = if success {
            "Workflow completed successfully"
        } else {
            "Workflow completed with failures"
        };
        if success {
            info!(
                run = %run_id,
                reviewed = reviews.reviewed_count,
                tracked = tracking.tracked_count,
                "workflow run finished"
            );
        } else {
            warn!(run = %run_id, "workflow run finished with failures");
        }

        AutomationResult {
            run_id,
            success,
            message: message.to_owned(),
            reviews,
            tracking,
            started_at,
            finished_at: self.clock.utc(),
        }
    }

    /// Takes a snapshot of open pull requests, pending reviews and
    /// collaborator health.
    pub async fn status(&self) -> StatusSnapshot {
        let taken_at = self.clock.utc();
        let tracking_connected = self.tracking.read_all().await.is_ok();
        let (open_prs, pending_reviews, error) = match self.try_pending_reviews().await {
            Ok(scan) => (count(scan.open), count(scan.pending.len()), None),
            Err(err) => {
                error!(error = %err, "status snapshot incomplete");
                (0, 0, Some(OperationFailure::from(&err)))
            }
        };

        StatusSnapshot {
            repository: self.settings.repository.clone(),
            open_prs,
            pending_reviews,
            tracking_connected,
            ai_model: self.generator.model_name(),
            taken_at,
            error,
        }
    }

    /// Lists open pull requests that are not yet approved.
    pub async fn pending_reviews(&self) -> PendingReviewsResult {
        match self.try_pending_reviews().await {
            Ok(pending) => PendingReviewsResult {
                success: true,
                pending: pending.pending,
                error: None,
            },
            Err(err) => {
                error!(error = %err, "listing pending reviews failed");
                PendingReviewsResult {
                    success: false,
                    pending: Vec::new(),
                    error: Some(OperationFailure::from(&err)),
                }
            }
        }
    }

    /// Removes every tracking row.
    pub async fn clear_tracking(&self) -> ClearResult {
        match self.tracking.clear_all().await {
            Ok(rows_cleared) => {
                info!(rows_cleared, "tracking cleared");
                ClearResult {
                    success: true,
                    rows_cleared,
                    error: None,
                }
            }
            Err(source) => {
                let err = AutomationError::from(source);
                error!(error = %err, "clearing tracking failed");
                ClearResult {
                    success: false,
                    rows_cleared: 0,
                    error: Some(OperationFailure::from(&err)),
                }
            }
        }
    }

    /// Syncs approval state into the tracking store without publishing it.
    pub async fn sync_tracking(&self) -> TrackingResult {
        self.track_approvals(true, false).await
    }

    /// Computes totals over the tracking rows.
    pub async fn tracking_statistics(&self) -> StatisticsResult {
        match self.tracking.read_all().await {
            Ok(rows) => StatisticsResult {
                success: true,
                statistics: TrackingStatistics::from_rows(&rows),
                error: None,
            },
            Err(source) => {
                let err = AutomationError::from(source);
                error!(error = %err, "reading tracking rows failed");
                StatisticsResult {
                    success: false,
                    statistics: TrackingStatistics::default(),
                    error: Some(OperationFailure::from(&err)),
                }
            }
        }
    }

    async fn try_create_pull_request(
        &self,
        request: CreatePullRequestRequest,
    ) -> ServiceResult<PrResult> {
        let head = BranchName::new(request.branch.as_str())?;
        let base = BranchName::new(request.base_branch.as_str())?;
        let branch = self
            .source_control
            .get_branch(&head)
            .await?
            .ok_or_else(|| AutomationError::BranchNotFound(head.clone()))?;

        let (content, content_source) = if request.needs_generation() {
            let generated = self
                .generator
                .generate_pr_content(&branch, request.prompt.clone())
                .await;
            let source = if generated.is_fallback() {
                ContentSource::Fallback
            } else {
                ContentSource::Generated
            };
            (generated.into_inner(), source)
        } else {
            let content = AiContent {
                title: String::new(),
                description: String::new(),
                labels: Vec::new(),
                reviewers: Vec::new(),
            };
            (content, ContentSource::Supplied)
        };

        let title = request
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(content.title);
        let labels = prefer_explicit(request.labels.clone(), content.labels);
        let suggested = request.reviewers.is_empty() && !content.reviewers.is_empty();
        let mut reviewers = prefer_explicit(request.reviewers.clone(), content.reviewers);
        let draft = NewPullRequest::new(title, head, base, content.description, labels)?;
        let collaborators = if suggested {
            Some(self.source_control.list_collaborators().await?)
        } else {
            None
        };

        let record = self.source_control.create_pull_request(&draft).await?;
        let number = record.number();
        info!(pr = %number, source = ?content_source, "pull request opened");

        if let Some(collaborators) = &collaborators {
            let eligible = eligible_reviewers(&reviewers, collaborators, record.author());
            if eligible.len() < reviewers.len() {
                warn!(
                    pr = %number,
                    suggested = ?reviewers,
                    eligible = ?eligible,
                    "dropped suggested reviewers who cannot review"
                );
            }
            reviewers = eligible;
        }

        let integration = if reviewers.is_empty() {
            match self.settings.reviewer_policy {
                ReviewerPolicy::AutoIntegrateUnreviewed => self.integrate(number).await,
                ReviewerPolicy::LeavePending => IntegrationOutcome::NotAttempted,
            }
        } else {
            self.source_control
                .request_reviewers(number, &reviewers)
                .await?;
            info!(pr = %number, reviewers = ?reviewers, "reviewers requested");
            if request.auto_merge {
                self.integrate(number).await
            } else {
                IntegrationOutcome::NotAttempted
            }
        };

        let update = TrackingUpdate::at(self.clock.utc())
            .title(record.title())
            .status(PullRequestState::Open)
            .review_status(ReviewStatus::Pending)
            .approvals(INITIAL_APPROVALS)
            .comments_count(0);
        self.tracking.upsert_row(number, &update).await?;

        Ok(PrResult {
            success: true,
            pr_number: Some(number),
            title: Some(record.title().to_owned()),
            url: Some(record.url().to_owned()),
            description: Some(draft.body),
            reviewers,
            content_source: Some(content_source),
            integration,
            error: None,
        })
    }

    async fn integrate(&self, number: PullRequestNumber) -> IntegrationOutcome {
        match self.source_control.auto_integrate(number).await {
            Ok(()) => {
                info!(pr = %number, "pull request integrated");
                IntegrationOutcome::Integrated
            }
            Err(err) => {
                warn!(pr = %number, error = %err, "automatic integration failed");
                let reason = match err {
                    SourceControlError::Rejected { message, .. } => message,
                    other => other.to_string(),
                };
                IntegrationOutcome::Failed { reason }
            }
        }
    }

    async fn try_analyze_pull_request(
        &self,
        number: PullRequestNumber,
    ) -> ServiceResult<AnalysisResult> {
        self.source_control
            .get_pull_request(number)
            .await?
            .ok_or(AutomationError::PullRequestNotFound(number))?;
        let files = self.source_control.get_changed_files(number).await?;

        let generated = self.generator.analyze_changes(&files).await;
        let used_fallback = generated.is_fallback();
        let analysis = generated.into_inner();
        info!(pr = %number, impact = %analysis.impact, used_fallback, "changes analysed");

        Ok(AnalysisResult {
            success: true,
            pr_number: Some(number),
            files: files.iter().map(ClassifiedFile::from).collect(),
            analysis: Some(analysis),
            used_fallback,
            error: None,
        })
    }

    async fn try_review_pull_request(
        &self,
        number: PullRequestNumber,
        auto_comment: bool,
    ) -> ServiceResult<ReviewResult> {
        let pull_request = self
            .source_control
            .get_pull_request(number)
            .await?
            .ok_or(AutomationError::PullRequestNotFound(number))?;
        let files = self.source_control.get_changed_files(number).await?;

        let generated = self
            .generator
            .review_pull_request(&pull_request, &files)
            .await;
        let used_fallback = generated.is_fallback();
        let review = generated.into_inner();

        let posted = if auto_comment {
            self.post_comments(number, &review.comments).await
        } else {
            0
        };
        self.record_review(&pull_request, posted).await?;
        info!(
            pr = %number,
            comments = posted,
            score = review.score,
            used_fallback,
            "pull request reviewed"
        );

        Ok(ReviewResult {
            success: true,
            reviewed_count: 1,
            comments_count: posted,
            summary: Some(review.summary),
            score: Some(review.score),
            used_fallback,
            error: None,
        })
    }

    /// Posts comments in order and stops at the first failure. Returns how
    /// many were posted.
    async fn post_comments(&self, number: PullRequestNumber, comments: &[InlineComment]) -> u32 {
        let mut posted = 0_u32;
        for comment in comments {
            if let Err(err) = self
                .source_control
                .add_inline_comment(number, comment)
                .await
            {
                warn!(pr = %number, posted, error = %err, "stopped posting review comments");
                break;
            }
            posted = posted.saturating_add(1);
        }
        posted
    }

    async fn record_review(
        &self,
        pull_request: &PullRequestRecord,
        comments_posted: u32,
    ) -> ServiceResult<()> {
        let number = pull_request.number();
        let update = TrackingUpdate::at(self.clock.utc())
            .review_status(ReviewStatus::Reviewed)
            .comments_count(comments_posted);
        if let Some(row) = self.tracking.find_row(number).await? {
            match self.tracking.update_fields(row, &update).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_stale_handle() => {
                    warn!(pr = %number, error = %err, "tracking row moved; upserting");
                }
                Err(err) => return Err(err.into()),
            }
        }
        let seeded = update
            .title(pull_request.title())
            .status(pull_request.state());
        self.tracking.upsert_row(number, &seeded).await?;
        Ok(())
    }

    async fn track_one(
        &self,
        pull_request: &PullRequestRecord,
        sync_tracking: bool,
        publish_status: bool,
    ) -> ServiceResult<(ApprovalStatus, bool)> {
        let number = pull_request.number();
        let status = self.source_control.get_approval_status(number).await?;
        if publish_status {
            self.source_control
                .publish_approval_status(number, &status)
                .await?;
        }
        if !sync_tracking {
            return Ok((status, false));
        }

        let update = TrackingUpdate::at(self.clock.utc())
            .title(pull_request.title())
            .status(pull_request.state())
            .approvals(status.render());
        self.tracking.upsert_row(number, &update).await?;
        Ok((status, true))
    }

    async fn try_pending_reviews(&self) -> ServiceResult<PendingScan> {
        let open = self.source_control.list_open_pull_requests().await?;
        let mut pending = Vec::new();
        for pull_request in &open {
            let number = pull_request.number();
            let status = self.source_control.get_approval_status(number).await?;
            if !status.is_approved() {
                pending.push(PrApproval {
                    pr_number: number,
                    status,
                });
            }
        }
        Ok(PendingScan {
            open: open.len(),
            pending,
        })
    }
}

struct PendingScan {
    open: usize,
    pending: Vec<PrApproval>,
}

fn prefer_explicit(explicit: Vec<String>, generated: Vec<String>) -> Vec<String> {
    if explicit.is_empty() {
        generated
    } else {
        explicit
    }
}

/// Keeps suggested reviewers who are collaborators other than the author,
/// in suggestion order, using the host's spelling and dropping duplicates.
fn eligible_reviewers(
    suggested: &[String],
    collaborators: &[String],
    author: &str,
) -> Vec<String> {
    let mut eligible: Vec<String> = Vec::with_capacity(suggested.len());
    for suggestion in suggested {
        let login = suggestion.trim().trim_start_matches('@');
        let known = collaborators
            .iter()
            .find(|collaborator| collaborator.eq_ignore_ascii_case(login));
        if let Some(collaborator) = known {
            let is_author = collaborator.eq_ignore_ascii_case(author);
            if !is_author && !eligible.contains(collaborator) {
                eligible.push(collaborator.clone());
            }
        }
    }
    eligible
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
