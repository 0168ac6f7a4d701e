//! Then steps for pull request lifecycle BDD scenarios.

use prflow::automation::{
    domain::{FailureKind, IntegrationOutcome, PrResult, PullRequestState},
    ports::{SourceControlClient, TrackingStore},
};
use rstest_bdd_macros::then;

use super::world::{LifecycleWorld, run_async};

fn created(world: &LifecycleWorld) -> Result<&PrResult, eyre::Report> {
    world
        .last_created
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing creation result in scenario world"))
}

#[then(r#"the pull request is open with the title "{title}""#)]
fn pull_request_open(world: &LifecycleWorld, title: String) -> Result<(), eyre::Report> {
    let number = world.opened_number()?;
    let record = run_async(world.host.get_pull_request(number))?
        .ok_or_else(|| eyre::eyre!("pull request {number} missing at host"))?;
    if record.state() != PullRequestState::Open {
        return Err(eyre::eyre!("expected an open pull request"));
    }
    if record.title() != title {
        return Err(eyre::eyre!("expected title '{title}', found '{}'", record.title()));
    }
    Ok(())
}

#[then(r#"the pull request title is "{title}""#)]
fn pull_request_title(world: &LifecycleWorld, title: String) -> Result<(), eyre::Report> {
    let result = created(world)?;
    if result.title.as_deref() != Some(title.as_str()) {
        return Err(eyre::eyre!("expected title '{title}', got {:?}", result.title));
    }
    Ok(())
}

#[then(r#"reviewer "{reviewer}" has been requested"#)]
fn reviewer_requested(world: &LifecycleWorld, reviewer: String) -> Result<(), eyre::Report> {
    let number = world.opened_number()?;
    let record = run_async(world.host.get_pull_request(number))?
        .ok_or_else(|| eyre::eyre!("pull request {number} missing at host"))?;
    if !record.requested_reviewers().contains(&reviewer) {
        return Err(eyre::eyre!("expected '{reviewer}' to be requested"));
    }
    Ok(())
}

#[then("the pull request has been integrated")]
fn pull_request_integrated(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let result = created(world)?;
    if result.integration != IntegrationOutcome::Integrated {
        return Err(eyre::eyre!(
            "expected integration, got {:?}",
            result.integration
        ));
    }
    let number = world.opened_number()?;
    let record = run_async(world.host.get_pull_request(number))?
        .ok_or_else(|| eyre::eyre!("pull request {number} missing at host"))?;
    if !record.is_merged() {
        return Err(eyre::eyre!("expected the pull request to be merged"));
    }
    Ok(())
}

#[then("creation fails with a remote write error")]
fn creation_fails_remote(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let result = created(world)?;
    match &result.error {
        Some(failure) if !result.success && failure.kind == FailureKind::RemoteWrite => Ok(()),
        other => Err(eyre::eyre!("expected a remote write failure, got {other:?}")),
    }
}

#[then("no tracking row exists")]
fn no_tracking_row(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let stats = run_async(world.service.tracking_statistics());
    if stats.statistics.total != 0 {
        return Err(eyre::eyre!(
            "expected an empty tracking store, found {} rows",
            stats.statistics.total
        ));
    }
    Ok(())
}

#[then(r#"the tracking row shows approvals "{approvals}""#)]
fn tracking_row_approvals(world: &LifecycleWorld, approvals: String) -> Result<(), eyre::Report> {
    let number = world.opened_number()?;
    let rows = run_async(world.tracking.read_all())?;
    let row = rows
        .iter()
        .find(|row| row.pr_number == number)
        .ok_or_else(|| eyre::eyre!("missing tracking row for {number}"))?;
    if row.approvals != approvals {
        return Err(eyre::eyre!(
            "expected approvals '{approvals}', found '{}'",
            row.approvals
        ));
    }
    Ok(())
}

#[then("the approval rate is {rate:u32} percent")]
fn approval_rate(world: &LifecycleWorld, rate: u32) -> Result<(), eyre::Report> {
    let failed = world
        .last_tracking
        .as_ref()
        .filter(|tracking| !tracking.success);
    if let Some(tracking) = failed {
        return Err(eyre::eyre!("tracking failed: {:?}", tracking.error));
    }
    let stats = run_async(world.service.tracking_statistics());
    if stats.statistics.approval_rate_percent != rate {
        return Err(eyre::eyre!(
            "expected {rate}% approval rate, found {}%",
            stats.statistics.approval_rate_percent
        ));
    }
    Ok(())
}
