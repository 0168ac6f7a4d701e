//! Given steps for pull request lifecycle BDD scenarios.

use prflow::automation::{
    domain::{BranchName, BranchSnapshot},
    ports::CompletionError,
};
use rstest_bdd_macros::given;
use serde_json::json;

use super::world::LifecycleWorld;

#[given(r#"a published branch "{name}""#)]
fn published_branch(world: &mut LifecycleWorld, name: String) -> Result<(), eyre::Report> {
    let snapshot = BranchSnapshot::new(BranchName::new(name)?, "abc123", "Add retry", "alice")
        .with_changed_files(["src/lib.rs".to_owned()])
        .with_line_counts(20, 2);
    world.host.add_branch(snapshot)?;
    Ok(())
}

#[given(r#""{identity}" collaborates on the repository"#)]
fn collaborator(world: &mut LifecycleWorld, identity: String) -> Result<(), eyre::Report> {
    world.host.add_collaborator(identity)?;
    Ok(())
}

#[given(r#"the completion service suggests the title "{title}" with reviewer "{reviewer}""#)]
fn completion_suggests(world: &mut LifecycleWorld, title: String, reviewer: String) {
    let answer = json!({
        "title": title,
        "description": "Generated for the scenario.",
        "labels": ["enhancement"],
        "reviewers": [reviewer],
    });
    let _queued = world.completion.clone().respond_with(answer.to_string());
}

#[given("the completion service is unavailable")]
fn completion_unavailable(world: &mut LifecycleWorld) {
    let _queued = world.completion.clone().fail_with(CompletionError::Status {
        status: 503,
        message: "service unavailable".to_owned(),
    });
}
