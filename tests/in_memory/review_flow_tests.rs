//! In-memory integration tests for automated review.

use prflow::automation::{
    adapters::memory::ScriptedCompletionClient,
    domain::{ChangeImpact, FileKind, PullRequestNumber, ReviewStatus},
};
use rstest::rstest;

use super::helpers::Harness;

const REVIEW: &str = r#"Here is my review:
{
    "summary": "Retry loop looks correct",
    "score": 8,
    "comments": [
        {"body": "Cap the number of attempts", "path": "src/lib.rs", "line": 3},
        {"body": "This file is not in the diff", "path": "docs/guide.md", "line": 1},
        {"body": "Consider a jittered delay"}
    ],
    "suggestions": ["Add a test for the final attempt"],
    "issues": []
}"#;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_posts_comments_until_the_host_refuses() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new().respond_with(REVIEW));
    let number = harness.seed_pull_request(5, "Add retry")?;

    let result = harness.service.review_pull_request(number, true).await;

    eyre::ensure!(result.success, "review failed: {:?}", result.error);
    assert_eq!(result.summary.as_deref(), Some("Retry loop looks correct"));
    assert_eq!(result.score, Some(8.0));
    assert_eq!(result.comments_count, 1);
    assert_eq!(harness.host.comments(number)?.len(), 1);

    let row = harness
        .row(number)
        .await?
        .ok_or_else(|| eyre::eyre!("review should seed a tracking row"))?;
    assert_eq!(row.title, "Add retry");
    assert_eq!(row.review_status, ReviewStatus::Reviewed);
    assert_eq!(row.comments_count, 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_prompt_carries_the_diff() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new().respond_with("{}"));
    let number = harness.seed_pull_request(8, "Tidy parser")?;

    let result = harness.service.review_pull_request(number, false).await;

    eyre::ensure!(result.success, "review failed: {:?}", result.error);
    let requests = harness.completion.requests();
    let request = requests
        .first()
        .ok_or_else(|| eyre::eyre!("expected one completion request"))?;
    assert!(request.user.contains("Pull Request: #8 - Tidy parser"));
    assert!(request.user.contains("+ fn retry() {}"));
    assert_eq!(result.summary.as_deref(), Some("AI review completed"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unusable_completion_yields_the_neutral_review() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new().respond_with("no json here"));
    let number = harness.seed_pull_request(2, "Refactor")?;

    let result = harness.service.review_pull_request(number, true).await;

    eyre::ensure!(result.success, "review failed: {:?}", result.error);
    assert!(result.used_fallback);
    assert_eq!(result.score, Some(7.0));
    assert_eq!(result.comments_count, 0);
    assert!(harness.host.comments(number)?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_review_covers_every_open_pull_request() -> eyre::Result<()> {
    let harness = Harness::new(
        ScriptedCompletionClient::new()
            .respond_with(r#"{"comments": [{"body": "one", "path": "src/lib.rs", "line": 1}]}"#)
            .respond_with(r#"{"comments": [{"body": "two"}, {"body": "three"}]}"#),
    );
    harness.seed_pull_request(1, "First")?;
    harness.seed_pull_request(2, "Second")?;

    let result = harness.service.review_all_open(true).await;

    assert!(result.success);
    assert_eq!(result.reviewed_count, 2);
    assert_eq!(result.comments_count, 3);
    assert_eq!(harness.host.comments(PullRequestNumber::new(2)?)?.len(), 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reviewing_a_missing_pull_request_reports_not_found() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());

    let result = harness
        .service
        .review_pull_request(PullRequestNumber::new(77)?, true)
        .await;

    assert!(!result.success);
    assert!(harness.completion.requests().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn analysis_sends_classified_files_and_reads_the_assessment() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new().respond_with(
        r#"{"patterns": ["retry wrapper"], "impact": "Low", "risks": [],
            "testing_needs": ["simulate timeouts"], "performance_notes": null}"#,
    ));
    let number = harness.seed_pull_request(6, "Add retry")?;

    let result = harness.service.analyze_pull_request(number).await;

    eyre::ensure!(result.success, "analysis failed: {:?}", result.error);
    assert!(!result.used_fallback);
    let file = result
        .files
        .first()
        .ok_or_else(|| eyre::eyre!("expected one classified file"))?;
    assert_eq!(file.kind, FileKind::Code);
    let analysis = result
        .analysis
        .ok_or_else(|| eyre::eyre!("expected an assessment"))?;
    assert_eq!(analysis.impact, ChangeImpact::Low);
    assert_eq!(analysis.testing_needs, vec!["simulate timeouts".to_owned()]);
    assert_eq!(analysis.performance_notes, None);

    let requests = harness.completion.requests();
    let request = requests
        .first()
        .ok_or_else(|| eyre::eyre!("expected one completion request"))?;
    assert!(request.user.contains("File: src/lib.rs"));
    assert!(request.user.contains("Type: code"));
    Ok(())
}
