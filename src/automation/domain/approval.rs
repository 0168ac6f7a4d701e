//! Review submissions and the approval status derived from them.

use super::ParseStateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Required approvals when the base branch carries no protection rule.
pub const DEFAULT_REQUIRED_APPROVALS: u32 = 1;

/// State of a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// The reviewer approved the change.
    Approved,
    /// The reviewer asked for changes.
    ChangesRequested,
    /// The reviewer left comments without a verdict.
    Commented,
    /// An earlier verdict was dismissed.
    Dismissed,
    /// The review has not been submitted yet.
    Pending,
}

impl ReviewState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Commented => "commented",
            Self::Dismissed => "dismissed",
            Self::Pending => "pending",
        }
    }

    /// Returns whether this state replaces a reviewer's earlier verdict.
    ///
    /// Comments and pending drafts leave an earlier approval or change
    /// request in force.
    #[must_use]
    pub const fn is_verdict(self) -> bool {
        matches!(self, Self::Approved | Self::ChangesRequested | Self::Dismissed)
    }
}

impl TryFrom<&str> for ReviewState {
    type Error = ParseStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Self::Approved),
            "changes_requested" => Ok(Self::ChangesRequested),
            "commented" => Ok(Self::Commented),
            "dismissed" => Ok(Self::Dismissed),
            "pending" => Ok(Self::Pending),
            _ => Err(ParseStateError::new("review state", value)),
        }
    }
}

/// One review submitted against a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Reviewer identity.
    pub reviewer: String,
    /// Submitted state.
    pub state: ReviewState,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

impl ReviewSubmission {
    /// Creates a review submission.
    #[must_use]
    pub fn new(
        reviewer: impl Into<String>,
        state: ReviewState,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            state,
            submitted_at,
        }
    }
}

/// Approval status derived from the latest verdict of each reviewer.
///
/// The status is recomputed on every query and never cached, because review
/// state can change between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    approvers: Vec<String>,
    required: u32,
}

impl ApprovalStatus {
    /// Derives the status from review history and branch protection.
    ///
    /// Only each reviewer's most recent verdict counts, so a later change
    /// request invalidates an earlier approval by the same reviewer. Reviews
    /// with equal timestamps keep their input order. `protection_required`
    /// is the branch protection's approval count; `None` and values below
    /// one both require a single approval.
    #[must_use]
    pub fn from_reviews(reviews: &[ReviewSubmission], protection_required: Option<u32>) -> Self {
        let mut ordered: Vec<&ReviewSubmission> = reviews.iter().collect();
        ordered.sort_by_key(|review| review.submitted_at);

        let mut latest: BTreeMap<&str, ReviewState> = BTreeMap::new();
        for review in ordered.into_iter().filter(|review| review.state.is_verdict()) {
            latest.insert(review.reviewer.as_str(), review.state);
        }

        let approvers = latest
            .into_iter()
            .filter(|(_, state)| *state == ReviewState::Approved)
            .map(|(reviewer, _)| reviewer.to_owned())
            .collect();

        Self::new(approvers, protection_required)
    }

    /// Creates a status from an explicit approver list.
    #[must_use]
    pub fn new(mut approvers: Vec<String>, protection_required: Option<u32>) -> Self {
        approvers.sort();
        approvers.dedup();
        let required = protection_required
            .unwrap_or(DEFAULT_REQUIRED_APPROVALS)
            .max(DEFAULT_REQUIRED_APPROVALS);
        Self {
            approvers,
            required,
        }
    }

    /// Returns the approving identities in sorted order.
    #[must_use]
    pub fn approvers(&self) -> &[String] {
        &self.approvers
    }

    /// Returns the number of approvals required.
    #[must_use]
    pub const fn required(&self) -> u32 {
        self.required
    }

    /// Returns the number of distinct approvers.
    #[must_use]
    pub fn approved_count(&self) -> u32 {
        u32::try_from(self.approvers.len()).unwrap_or(u32::MAX)
    }

    /// Returns how many approvals are still missing.
    #[must_use]
    pub fn pending_count(&self) -> u32 {
        self.required.saturating_sub(self.approved_count())
    }

    /// Returns whether the required approvals are met.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approved_count() >= self.required
    }

    /// Renders the tracking-row form, `"{approved}/{required}"`, with a
    /// checkmark suffix once fully approved.
    #[must_use]
    pub fn render(&self) -> String {
        let counts = format!("{}/{}", self.approved_count(), self.required);
        if self.is_approved() {
            format!("{counts} {APPROVED_MARK}")
        } else {
            counts
        }
    }
}

/// Suffix appended to rendered approvals once a pull request is approved.
pub const APPROVED_MARK: &str = "✅";
