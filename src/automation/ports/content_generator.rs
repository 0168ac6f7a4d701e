//! Content generation port for pull request metadata and code review.

use crate::automation::domain::{
    AiContent, AiReview, BranchSnapshot, ChangeAnalysis, FileDelta, Generated, PullRequestRecord,
};
use async_trait::async_trait;

/// Generation contract. Implementations never fail: unusable output is
/// replaced by the deterministic fallback and reported as
/// [`Generated::Fallback`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates a title, description, labels and reviewers for a branch.
    async fn generate_pr_content(
        &self,
        branch: &BranchSnapshot,
        custom_prompt: Option<String>,
    ) -> Generated<AiContent>;

    /// Reviews a pull request's changes.
    async fn review_pull_request(
        &self,
        pull_request: &PullRequestRecord,
        files: &[FileDelta],
    ) -> Generated<AiReview>;

    /// Assesses patterns, impact and risk across a set of changed files.
    async fn analyze_changes(&self, files: &[FileDelta]) -> Generated<ChangeAnalysis>;

    /// Names the model behind the generator.
    fn model_name(&self) -> String;
}
