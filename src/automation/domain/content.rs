//! AI-generated pull request content and reviews, with deterministic
//! fallbacks.

use super::{BranchSnapshot, PullRequestRecord};
use serde::{Deserialize, Serialize};

/// Label applied when generated content is unavailable.
pub const FALLBACK_LABEL: &str = "enhancement";

/// Score assigned by the fallback review.
pub const FALLBACK_REVIEW_SCORE: f64 = 7.0;

/// Highest score a review may carry.
pub const MAX_REVIEW_SCORE: f64 = 10.0;

/// Output of a generation call that never fails.
///
/// `Fallback` carries the deterministic substitute together with the reason
/// the generated value could not be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Generated<T> {
    /// The completion service produced a usable value.
    Ai {
        /// Parsed generated value.
        value: T,
    },
    /// The completion failed or was unparsable.
    Fallback {
        /// Deterministic substitute.
        value: T,
        /// Why generation was abandoned.
        reason: String,
    },
}

impl<T> Generated<T> {
    /// Wraps a generated value.
    pub const fn ai(value: T) -> Self {
        Self::Ai { value }
    }

    /// Wraps a fallback value with the failure reason.
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self::Fallback {
            value,
            reason: reason.into(),
        }
    }

    /// Returns whether the fallback was used.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Borrows the carried value.
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Ai { value } | Self::Fallback { value, .. } => value,
        }
    }

    /// Consumes the wrapper and returns the carried value.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Ai { value } | Self::Fallback { value, .. } => value,
        }
    }
}

/// Generated pull request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiContent {
    /// Pull request title.
    pub title: String,
    /// Pull request description.
    pub description: String,
    /// Suggested labels.
    pub labels: Vec<String>,
    /// Suggested reviewer identities.
    pub reviewers: Vec<String>,
}

impl AiContent {
    /// Builds the deterministic content used when generation fails.
    #[must_use]
    pub fn fallback_for(branch: &BranchSnapshot) -> Self {
        Self {
            title: default_title(branch),
            description: format!(
                "{}\n\nCommit: {}\nAuthor: {}",
                default_description(branch),
                branch.commit_message(),
                branch.author()
            ),
            labels: vec![FALLBACK_LABEL.to_owned()],
            reviewers: Vec::new(),
        }
    }
}

/// Title used when none is supplied or generated.
#[must_use]
pub fn default_title(branch: &BranchSnapshot) -> String {
    format!("Update {}", branch.name())
}

/// Description used when generated content omits one.
#[must_use]
pub fn default_description(branch: &BranchSnapshot) -> String {
    format!("Changes from branch {}", branch.name())
}

/// Inline review comment, optionally anchored to a file line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineComment {
    /// Comment text.
    pub body: String,
    /// File the comment refers to.
    pub path: Option<String>,
    /// Line within `path`.
    pub line: Option<u32>,
}

impl InlineComment {
    /// Creates an unanchored comment.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            path: None,
            line: None,
        }
    }

    /// Anchors the comment to a file line.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>, line: u32) -> Self {
        self.path = Some(path.into());
        self.line = Some(line);
        self
    }

    /// Returns whether both a path and a line are present.
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.path.is_some() && self.line.is_some()
    }
}

/// Generated code review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiReview {
    /// Overall assessment.
    pub summary: String,
    /// Quality score between 0 and 10.
    pub score: f64,
    /// Inline comments to post.
    pub comments: Vec<InlineComment>,
    /// Improvement suggestions.
    pub suggestions: Vec<String>,
    /// Problems found.
    pub issues: Vec<String>,
}

impl AiReview {
    /// Builds the deterministic review used when generation fails.
    #[must_use]
    pub fn fallback_for(pull_request: &PullRequestRecord) -> Self {
        Self {
            summary: format!(
                "Review of PR #{} - {}",
                pull_request.number().value(),
                pull_request.title()
            ),
            score: FALLBACK_REVIEW_SCORE,
            comments: Vec::new(),
            suggestions: vec![
                "Consider adding more documentation".to_owned(),
                "Review for potential edge cases".to_owned(),
            ],
            issues: Vec::new(),
        }
    }
}

/// Clamps a raw score into the review range. Non-finite input yields the
/// fallback score.
#[must_use]
pub fn normalise_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, MAX_REVIEW_SCORE)
    } else {
        FALLBACK_REVIEW_SCORE
    }
}
