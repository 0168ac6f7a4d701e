//! In-memory integration tests for pull request creation.

use prflow::automation::{
    adapters::memory::ScriptedCompletionClient,
    domain::{ContentSource, FailureKind, IntegrationOutcome, PullRequestState, ReviewStatus},
    ports::SourceControlClient,
    services::{AutomationSettings, CreatePullRequestRequest, ReviewerPolicy},
};
use rstest::rstest;

use super::helpers::{Harness, REPOSITORY};

const GENERATED_WITH_REVIEWER: &str = r#"{
    "title": "Add retry logic to the fetcher",
    "description": "Retries transient network failures with backoff.",
    "labels": ["enhancement", "reliability"],
    "reviewers": ["bob"]
}"#;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_pull_request_requests_reviewers_and_is_tracked() -> eyre::Result<()> {
    let harness =
        Harness::new(ScriptedCompletionClient::new().respond_with(GENERATED_WITH_REVIEWER));
    harness.publish_branch("feature/retry")?;
    harness.add_collaborators(&["bob"])?;

    let result = harness
        .service
        .create_pull_request(CreatePullRequestRequest::new("feature/retry", "main"))
        .await;

    eyre::ensure!(result.success, "creation failed: {:?}", result.error);
    let number = result
        .pr_number
        .ok_or_else(|| eyre::eyre!("missing pull request number"))?;
    assert_eq!(result.content_source, Some(ContentSource::Generated));
    assert_eq!(result.integration, IntegrationOutcome::NotAttempted);
    assert_eq!(
        result.url,
        Some(format!("https://github.com/{REPOSITORY}/pull/1"))
    );

    let record = harness
        .host
        .get_pull_request(number)
        .await?
        .ok_or_else(|| eyre::eyre!("pull request missing at host"))?;
    assert_eq!(record.title(), "Add retry logic to the fetcher");
    assert!(record.requested_reviewers().contains("bob"));
    assert!(record.labels().contains("reliability"));

    let row = harness
        .row(number)
        .await?
        .ok_or_else(|| eyre::eyre!("tracking row missing"))?;
    assert_eq!(row.title, "Add retry logic to the fetcher");
    assert_eq!(row.status, PullRequestState::Open);
    assert_eq!(row.review_status, ReviewStatus::Pending);
    assert_eq!(row.approvals, "0/1");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_generation_falls_back_and_integrates() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    harness.publish_branch("feature/x")?;

    let result = harness
        .service
        .create_pull_request(CreatePullRequestRequest::new("feature/x", "main"))
        .await;

    eyre::ensure!(result.success, "creation failed: {:?}", result.error);
    assert_eq!(result.title.as_deref(), Some("Update feature/x"));
    assert_eq!(result.content_source, Some(ContentSource::Fallback));
    assert_eq!(result.integration, IntegrationOutcome::Integrated);
    assert!(harness.host.list_open_pull_requests().await?.is_empty());
    assert_eq!(harness.completion.requests().len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn supplied_title_never_calls_the_completion_service() -> eyre::Result<()> {
    let settings =
        AutomationSettings::new(REPOSITORY).with_reviewer_policy(ReviewerPolicy::LeavePending);
    let harness = Harness::with_settings(ScriptedCompletionClient::new(), settings);
    harness.publish_branch("feature/docs")?;

    let request = CreatePullRequestRequest::new("feature/docs", "main")
        .with_title("Document the retry policy")
        .with_labels(["documentation".to_owned()]);
    let result = harness.service.create_pull_request(request).await;

    eyre::ensure!(result.success, "creation failed: {:?}", result.error);
    assert_eq!(result.content_source, Some(ContentSource::Supplied));
    assert_eq!(result.integration, IntegrationOutcome::NotAttempted);
    assert!(harness.completion.requests().is_empty());
    assert_eq!(harness.host.list_open_pull_requests().await?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn requesting_the_author_leaves_an_untracked_pull_request() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    harness.publish_branch("feature/self")?;

    let request = CreatePullRequestRequest::new("feature/self", "main")
        .with_title("Self review")
        .with_reviewers(["automation-bot".to_owned()]);
    let result = harness.service.create_pull_request(request).await;

    assert!(!result.success);
    let failure = result
        .error
        .ok_or_else(|| eyre::eyre!("failure should be reported"))?;
    assert_eq!(failure.kind, FailureKind::RemoteWrite);
    assert!(failure.message.contains("pull request author"));
    assert_eq!(harness.host.list_open_pull_requests().await?.len(), 1);
    assert_eq!(harness.service.tracking_statistics().await.statistics.total, 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn suggested_reviewers_are_limited_to_collaborators() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new().respond_with(
        r#"{"title": "Tune retries", "reviewers": ["Carol", "mallory", "automation-bot"]}"#,
    ));
    harness.publish_branch("feature/tune")?;
    harness.add_collaborators(&["carol"])?;

    let result = harness
        .service
        .create_pull_request(CreatePullRequestRequest::new("feature/tune", "main"))
        .await;

    eyre::ensure!(result.success, "creation failed: {:?}", result.error);
    assert_eq!(result.reviewers, vec!["carol".to_owned()]);
    assert_eq!(result.integration, IntegrationOutcome::NotAttempted);
    let number = result
        .pr_number
        .ok_or_else(|| eyre::eyre!("missing pull request number"))?;
    let record = harness
        .host
        .get_pull_request(number)
        .await?
        .ok_or_else(|| eyre::eyre!("pull request missing at host"))?;
    assert_eq!(record.requested_reviewers().len(), 1);
    assert!(record.requested_reviewers().contains("carol"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_pull_request_for_a_branch_is_rejected() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    harness.publish_branch("feature/dup")?;
    harness.add_collaborators(&["bob"])?;
    let request = || {
        CreatePullRequestRequest::new("feature/dup", "main")
            .with_title("Duplicate")
            .with_reviewers(["bob".to_owned()])
    };

    let first = harness.service.create_pull_request(request()).await;
    let second = harness.service.create_pull_request(request()).await;

    eyre::ensure!(first.success, "first creation failed: {:?}", first.error);
    assert!(!second.success);
    assert_eq!(
        second.error.map(|failure| failure.kind),
        Some(FailureKind::RemoteWrite)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_branch_is_not_found() {
    let harness = Harness::new(ScriptedCompletionClient::new());

    let result = harness
        .service
        .create_pull_request(CreatePullRequestRequest::new("feature/missing", "main"))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.map(|failure| failure.kind),
        Some(FailureKind::NotFound)
    );
    assert!(harness.completion.requests().is_empty());
}
