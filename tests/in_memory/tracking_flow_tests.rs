//! In-memory integration tests for approval tracking and workflow runs.

use prflow::automation::{
    adapters::memory::ScriptedCompletionClient,
    domain::{BranchName, PullRequestState, ReviewState, TrackingStatistics},
    ports::SourceControlClient,
    services::AutomationSettings,
};
use rstest::rstest;

use super::helpers::{Harness, REPOSITORY};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approvals_are_published_and_synced() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    let approved = harness.seed_pull_request(1, "Approved change")?;
    let waiting = harness.seed_pull_request(2, "Waiting change")?;
    harness
        .host
        .submit_review(approved, "bob", ReviewState::Approved)?;
    harness
        .host
        .submit_review(waiting, "carol", ReviewState::ChangesRequested)?;

    let result = harness.service.track_approvals(true, true).await;

    eyre::ensure!(result.success, "tracking failed: {:?}", result.error);
    assert_eq!(result.tracked_count, 2);
    assert_eq!(result.rows_updated, 2);
    assert_eq!(harness.host.published_statuses()?.len(), 2);
    let approved_row = harness
        .row(approved)
        .await?
        .ok_or_else(|| eyre::eyre!("approved row missing"))?;
    assert_eq!(approved_row.approvals, "1/1 ✅");
    let waiting_row = harness
        .row(waiting)
        .await?
        .ok_or_else(|| eyre::eyre!("waiting row missing"))?;
    assert_eq!(waiting_row.approvals, "0/1");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn branch_protection_raises_the_threshold() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    harness
        .host
        .set_required_approvals(BranchName::new("main")?, 2)?;
    let number = harness.seed_pull_request(4, "Needs two")?;
    harness.host.submit_review(number, "bob", ReviewState::Approved)?;

    let pending = harness.service.pending_reviews().await;

    eyre::ensure!(pending.success, "pending scan failed: {:?}", pending.error);
    let entry = pending
        .pending
        .first()
        .ok_or_else(|| eyre::eyre!("expected one pending pull request"))?;
    assert_eq!(entry.pr_number, number);
    assert_eq!(entry.status.render(), "1/2");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workflow_run_reviews_tracks_and_reports() -> eyre::Result<()> {
    let harness = Harness::new(
        ScriptedCompletionClient::new()
            .respond_with(r#"{"summary": "ok", "score": 9}"#)
            .respond_with(r#"{"summary": "ok", "score": 6}"#),
    );
    let first = harness.seed_pull_request(1, "First")?;
    harness.seed_pull_request(2, "Second")?;
    harness.host.submit_review(first, "bob", ReviewState::Approved)?;

    let run = harness.service.run_single_workflow().await;

    eyre::ensure!(run.success, "workflow failed: {}", run.message);
    assert_eq!(run.reviews.reviewed_count, 2);
    assert_eq!(run.tracking.tracked_count, 2);
    assert_eq!(harness.host.published_statuses()?.len(), 2);

    let stats = harness.service.tracking_statistics().await;
    assert_eq!(stats.statistics.total, 2);
    assert_eq!(stats.statistics.approved, 1);
    assert_eq!(stats.statistics.pending_reviews, 0);
    assert_eq!(stats.statistics.approval_rate_percent, 50);

    let status = harness.service.status().await;
    assert_eq!(status.repository, REPOSITORY);
    assert_eq!(status.open_prs, 2);
    assert_eq!(status.pending_reviews, 1);
    assert!(status.tracking_connected);
    assert_eq!(status.ai_model, "llama-3.1-8b-instant");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workflow_without_sync_leaves_rows_alone() -> eyre::Result<()> {
    let settings = AutomationSettings::new(REPOSITORY).with_tracking_sync(false);
    let harness = Harness::with_settings(ScriptedCompletionClient::new(), settings);
    let number = harness.seed_pull_request(3, "Quiet")?;

    let run = harness.service.run_single_workflow().await;

    eyre::ensure!(run.success, "workflow failed: {}", run.message);
    assert_eq!(run.tracking.rows_updated, 0);
    let row = harness
        .row(number)
        .await?
        .ok_or_else(|| eyre::eyre!("review should still seed a row"))?;
    assert_eq!(row.approvals, "0/1");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sync_mirrors_integrated_pull_requests_as_closed() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    let number = harness.seed_pull_request(6, "Ship it")?;
    harness.host.auto_integrate(number).await?;

    let result = harness.service.sync_tracking().await;

    eyre::ensure!(result.success, "sync failed: {:?}", result.error);
    assert!(harness.host.published_statuses()?.is_empty());
    let row = harness
        .row(number)
        .await?
        .ok_or_else(|| eyre::eyre!("sync should create the row"))?;
    assert_eq!(row.status, PullRequestState::Closed);
    assert_eq!(row.title, "Ship it");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_tracking_empties_the_store() -> eyre::Result<()> {
    let harness = Harness::new(ScriptedCompletionClient::new());
    harness.seed_pull_request(1, "One")?;
    harness.seed_pull_request(2, "Two")?;
    let synced = harness.service.sync_tracking().await;
    eyre::ensure!(synced.success, "sync failed: {:?}", synced.error);

    let cleared = harness.service.clear_tracking().await;

    assert!(cleared.success);
    assert_eq!(cleared.rows_cleared, 2);
    assert_eq!(
        harness.service.tracking_statistics().await.statistics,
        TrackingStatistics::default()
    );
    Ok(())
}
