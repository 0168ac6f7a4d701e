//! Shared world state for pull request lifecycle BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use prflow::automation::{
    adapters::{
        CompletionContentGenerator, GeneratorSettings,
        memory::{InMemorySourceControl, InMemoryTrackingStore, ScriptedCompletionClient},
    },
    domain::{PrResult, PullRequestNumber, TrackingResult},
    services::{AutomationSettings, PrAutomationService},
};
use rstest::fixture;

/// Identity the host acts as when opening pull requests.
pub const BOT: &str = "automation-bot";

/// Service type used by the BDD world.
pub type TestAutomationService = PrAutomationService<
    InMemorySourceControl,
    CompletionContentGenerator<ScriptedCompletionClient>,
    InMemoryTrackingStore,
    DefaultClock,
>;

/// Scenario world for pull request lifecycle behaviour tests.
pub struct LifecycleWorld {
    /// In-memory host shared with the service.
    pub host: Arc<InMemorySourceControl>,
    /// Tracking store shared with the service.
    pub tracking: Arc<InMemoryTrackingStore>,
    /// Completion script shared with the generator.
    pub completion: ScriptedCompletionClient,
    /// The orchestrator under test.
    pub service: TestAutomationService,
    /// Result of the last creation attempt.
    pub last_created: Option<PrResult>,
    /// Result of the last tracking pass.
    pub last_tracking: Option<TrackingResult>,
}

impl LifecycleWorld {
    /// Creates a world with an empty host and completion script.
    #[must_use]
    pub fn new() -> Self {
        let host = Arc::new(InMemorySourceControl::new("acme/widgets", BOT));
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let completion = ScriptedCompletionClient::new();
        let generator = CompletionContentGenerator::new(
            Arc::new(completion.clone()),
            GeneratorSettings::default(),
        );
        let service = PrAutomationService::new(
            Arc::clone(&host),
            Arc::new(generator),
            Arc::clone(&tracking),
            Arc::new(DefaultClock),
            AutomationSettings::new("acme/widgets"),
        );
        Self {
            host,
            tracking,
            completion,
            service,
            last_created: None,
            last_tracking: None,
        }
    }

    /// Returns the number of the pull request opened by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if no pull request has been opened.
    pub fn opened_number(&self) -> Result<PullRequestNumber, eyre::Report> {
        self.last_created
            .as_ref()
            .and_then(|result| result.pr_number)
            .ok_or_else(|| eyre::eyre!("no pull request was opened in this scenario"))
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
