//! When steps for pull request lifecycle BDD scenarios.

use prflow::automation::{domain::ReviewState, services::CreatePullRequestRequest};
use rstest_bdd_macros::when;

use super::world::{LifecycleWorld, run_async};

#[when(r#"a pull request is opened from "{branch}" into "{base}""#)]
fn open_pull_request(world: &mut LifecycleWorld, branch: String, base: String) {
    let request = CreatePullRequestRequest::new(branch, base);
    world.last_created = Some(run_async(world.service.create_pull_request(request)));
}

#[when(
    r#"a pull request titled "{title}" is opened from "{branch}" into "{base}" for reviewer "{reviewer}""#
)]
fn open_pull_request_for_reviewer(
    world: &mut LifecycleWorld,
    title: String,
    branch: String,
    base: String,
    reviewer: String,
) {
    let request = CreatePullRequestRequest::new(branch, base)
        .with_title(title)
        .with_reviewers([reviewer]);
    world.last_created = Some(run_async(world.service.create_pull_request(request)));
}

#[when(r#""{reviewer}" approves the pull request"#)]
fn reviewer_approves(world: &mut LifecycleWorld, reviewer: String) -> Result<(), eyre::Report> {
    let number = world.opened_number()?;
    world
        .host
        .submit_review(number, &reviewer, ReviewState::Approved)?;
    Ok(())
}

#[when("approvals are tracked")]
fn approvals_tracked(world: &mut LifecycleWorld) {
    world.last_tracking = Some(run_async(world.service.track_approvals(true, true)));
}
