//! Shared harness for in-memory integration tests.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;
use prflow::automation::{
    adapters::{
        CompletionContentGenerator, GeneratorSettings,
        memory::{InMemorySourceControl, InMemoryTrackingStore, ScriptedCompletionClient},
    },
    domain::{
        BranchName, BranchSnapshot, FileDelta, PullRequestNumber, PullRequestRecord, TrackingRow,
    },
    ports::TrackingStore,
    services::{AutomationSettings, PrAutomationService},
};

/// Identity the in-memory host acts as when opening pull requests.
pub const BOT: &str = "automation-bot";

/// Repository used by every harness.
pub const REPOSITORY: &str = "acme/widgets";

/// Service wired to in-memory adapters.
pub type InMemoryService = PrAutomationService<
    InMemorySourceControl,
    CompletionContentGenerator<ScriptedCompletionClient>,
    InMemoryTrackingStore,
    DefaultClock,
>;

/// Orchestrator plus handles on the adapters behind it.
pub struct Harness {
    pub host: Arc<InMemorySourceControl>,
    pub tracking: Arc<InMemoryTrackingStore>,
    pub completion: ScriptedCompletionClient,
    pub service: InMemoryService,
}

impl Harness {
    /// Wires a service whose completions replay `completion`.
    #[must_use]
    pub fn new(completion: ScriptedCompletionClient) -> Self {
        Self::with_settings(completion, AutomationSettings::new(REPOSITORY))
    }

    /// Wires a service with explicit settings.
    #[must_use]
    pub fn with_settings(
        completion: ScriptedCompletionClient,
        settings: AutomationSettings,
    ) -> Self {
        let host = Arc::new(InMemorySourceControl::new(REPOSITORY, BOT));
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let generator = CompletionContentGenerator::new(
            Arc::new(completion.clone()),
            GeneratorSettings::default(),
        );
        let service = PrAutomationService::new(
            Arc::clone(&host),
            Arc::new(generator),
            Arc::clone(&tracking),
            Arc::new(DefaultClock),
            settings,
        );
        Self {
            host,
            tracking,
            completion,
            service,
        }
    }

    /// Publishes a feature branch touching `src/lib.rs` and `README.md`.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch name is invalid or the host rejects it.
    pub fn publish_branch(&self, name: &str) -> eyre::Result<()> {
        let snapshot = BranchSnapshot::new(BranchName::new(name)?, "abc123", "Add retry", "alice")
            .with_changed_files(["src/lib.rs".to_owned(), "README.md".to_owned()])
            .with_line_counts(40, 4);
        self.host.add_branch(snapshot)?;
        Ok(())
    }

    /// Registers `identities` as collaborators of the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the host state cannot be updated.
    pub fn add_collaborators(&self, identities: &[&str]) -> eyre::Result<()> {
        for &identity in identities {
            self.host.add_collaborator(identity)?;
        }
        Ok(())
    }

    /// Seeds an open pull request authored by `alice`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number or branch names are invalid.
    pub fn seed_pull_request(&self, number: u64, title: &str) -> eyre::Result<PullRequestNumber> {
        let pr_number = PullRequestNumber::new(number)?;
        let record = PullRequestRecord::new(
            pr_number,
            title,
            BranchName::new(format!("feature/{number}"))?,
            BranchName::new("main")?,
            "alice",
            Utc::now(),
        );
        self.host.add_pull_request(
            record,
            vec![FileDelta::new("src/lib.rs", "modified", 12, 3).with_patch("+ fn retry() {}")],
        )?;
        Ok(pr_number)
    }

    /// Returns the tracking row for `number`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking store cannot be read.
    pub async fn row(&self, number: PullRequestNumber) -> eyre::Result<Option<TrackingRow>> {
        let rows = self.tracking.read_all().await?;
        Ok(rows.into_iter().find(|row| row.pr_number == number))
    }
}
