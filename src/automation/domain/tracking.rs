//! Tracking rows mirroring pull request lifecycle and review state.

use super::{APPROVED_MARK, ParseStateError, PullRequestNumber, PullRequestState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approvals rendering for a freshly created row.
pub const INITIAL_APPROVALS: &str = "0/1";

/// Review progress recorded for a tracked pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// No automated review has run yet.
    Pending,
    /// An automated review has run.
    Reviewed,
}

impl ReviewStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewStatus {
    type Error = ParseStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            _ => Err(ParseStateError::new("review status", value)),
        }
    }
}

/// Position of a row inside a tracking store, bound to the pull request the
/// row belonged to when the handle was issued.
///
/// Handles are only valid until the next `clear_all`; stores reject a handle
/// whose position now holds a different pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowHandle {
    position: usize,
    pr_number: PullRequestNumber,
}

impl RowHandle {
    /// Wraps a zero-based row position holding `pr_number`.
    #[must_use]
    pub const fn new(position: usize, pr_number: PullRequestNumber) -> Self {
        Self {
            position,
            pr_number,
        }
    }

    /// Returns the zero-based row position.
    #[must_use]
    pub const fn position(self) -> usize {
        self.position
    }

    /// Returns the pull request the row was issued for.
    #[must_use]
    pub const fn pr_number(self) -> PullRequestNumber {
        self.pr_number
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} for PR {}", self.position, self.pr_number)
    }
}

/// One persisted tracking record, keyed by pull request number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRow {
    /// Unique key within the store.
    pub pr_number: PullRequestNumber,
    /// Pull request title.
    pub title: String,
    /// Lifecycle status mirrored from the pull request state.
    pub status: PullRequestState,
    /// Automated review progress.
    pub review_status: ReviewStatus,
    /// Rendered approval counts, e.g. `"1/2"` or `"2/2 ✅"`.
    pub approvals: String,
    /// Inline comments posted by the last automated review.
    pub comments_count: u32,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub last_updated: DateTime<Utc>,
}

impl TrackingRow {
    /// Creates a row from an update, filling unspecified fields with the
    /// values of a newly opened, unreviewed pull request.
    #[must_use]
    pub fn from_update(pr_number: PullRequestNumber, update: &TrackingUpdate) -> Self {
        let mut row = Self {
            pr_number,
            title: String::new(),
            status: PullRequestState::Open,
            review_status: ReviewStatus::Pending,
            approvals: INITIAL_APPROVALS.to_owned(),
            comments_count: 0,
            created_at: update.updated_at,
            last_updated: update.updated_at,
        };
        row.apply(update);
        row
    }

    /// Applies the fields present in `update` and bumps `last_updated`.
    pub fn apply(&mut self, update: &TrackingUpdate) {
        if let Some(title) = &update.title {
            self.title.clone_from(title);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(review_status) = update.review_status {
            self.review_status = review_status;
        }
        if let Some(approvals) = &update.approvals {
            self.approvals.clone_from(approvals);
        }
        if let Some(comments_count) = update.comments_count {
            self.comments_count = comments_count;
        }
        self.last_updated = update.updated_at;
    }

    /// Returns whether the rendered approvals carry the approved mark.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approvals.contains(APPROVED_MARK)
    }
}

/// Partial field set written to a tracking row.
///
/// `updated_at` is mandatory: every mutation bumps the row's last-updated
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUpdate {
    /// New title.
    pub title: Option<String>,
    /// New lifecycle status.
    pub status: Option<PullRequestState>,
    /// New review status.
    pub review_status: Option<ReviewStatus>,
    /// New rendered approvals.
    pub approvals: Option<String>,
    /// New comment count.
    pub comments_count: Option<u32>,
    /// Write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TrackingUpdate {
    /// Creates an update that only bumps the timestamp.
    #[must_use]
    pub const fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            status: None,
            review_status: None,
            approvals: None,
            comments_count: None,
            updated_at,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub const fn status(mut self, status: PullRequestState) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the review status.
    #[must_use]
    pub const fn review_status(mut self, review_status: ReviewStatus) -> Self {
        self.review_status = Some(review_status);
        self
    }

    /// Sets the rendered approvals.
    #[must_use]
    pub fn approvals(mut self, approvals: impl Into<String>) -> Self {
        self.approvals = Some(approvals.into());
        self
    }

    /// Sets the comment count.
    #[must_use]
    pub const fn comments_count(mut self, comments_count: u32) -> Self {
        self.comments_count = Some(comments_count);
        self
    }
}

/// Aggregate counts over all tracking rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStatistics {
    /// Rows in the store.
    pub total: u32,
    /// Rows mirroring open pull requests.
    pub open: u32,
    /// Rows mirroring closed pull requests.
    pub closed: u32,
    /// Rows whose approvals carry the approved mark.
    pub approved: u32,
    /// Rows not yet reviewed.
    pub pending_reviews: u32,
    /// `approved` as a whole percentage of `total`.
    pub approval_rate_percent: u32,
}

impl TrackingStatistics {
    /// Computes statistics over a set of rows.
    #[must_use]
    pub fn from_rows(rows: &[TrackingRow]) -> Self {
        let total = count_rows(rows, |_| true);
        let approved = count_rows(rows, TrackingRow::is_approved);
        let approval_rate_percent = u64::from(approved)
            .saturating_mul(100)
            .checked_div(u64::from(total))
            .and_then(|rate| u32::try_from(rate).ok())
            .unwrap_or(0);

        Self {
            total,
            open: count_rows(rows, |row| row.status == PullRequestState::Open),
            closed: count_rows(rows, |row| row.status == PullRequestState::Closed),
            approved,
            pending_reviews: count_rows(rows, |row| row.review_status == ReviewStatus::Pending),
            approval_rate_percent,
        }
    }
}

fn count_rows(rows: &[TrackingRow], predicate: impl Fn(&TrackingRow) -> bool) -> u32 {
    u32::try_from(rows.iter().filter(|&row| predicate(row)).count()).unwrap_or(u32::MAX)
}
