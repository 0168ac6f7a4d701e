//! Application services for pull request automation.

mod orchestrator;
mod scheduler;

pub use orchestrator::{
    AutomationError, AutomationSettings, CreatePullRequestRequest, PrAutomationService,
    ReviewerPolicy,
};
pub use scheduler::{
    ContinuousWorkflow, DEFAULT_CYCLE_INTERVAL, DEFAULT_FAILURE_BACKOFF, SchedulerConfig,
    SchedulerSummary, WorkflowCycle,
};

#[cfg(test)]
pub use scheduler::MockWorkflowCycle;
