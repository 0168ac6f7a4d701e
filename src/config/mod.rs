//! Runtime configuration.
//!
//! Configuration is read from TOML and then overlaid with environment
//! variables. Every field has a default, so an empty document plus
//! `GITHUB_REPO` is a complete configuration. Credentials are never part of
//! this structure; adapters that need them read them on their own.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::automation::{
    adapters::GeneratorSettings,
    services::{AutomationSettings, CreatePullRequestRequest, ReviewerPolicy, SchedulerConfig},
};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable holds an unparsable value.
    #[error("invalid value '{value}' for {variable}")]
    InvalidValue {
        /// Variable name.
        variable: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The repository is not in `owner/repo` form.
    #[error("repository must be in 'owner/repository' form, got '{0}'")]
    InvalidRepository(String),

    /// The base branch is blank.
    #[error("base branch must not be empty")]
    EmptyBaseBranch,

    /// A duration or count that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The sampling temperature is outside `0.0..=2.0`.
    #[error("temperature {0} is outside 0.0..=2.0")]
    InvalidTemperature(f32),
}

/// Complete automation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutomationConfig {
    /// Source-control host settings.
    pub source_control: SourceControlConfig,
    /// Completion model settings.
    pub generator: GeneratorConfig,
    /// Tracking settings.
    pub tracking: TrackingConfig,
    /// Scheduler settings.
    pub workflow: WorkflowConfig,
}

/// Source-control host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceControlConfig {
    /// Repository in `owner/repo` form.
    pub repository: String,
    /// Default base branch for new pull requests.
    pub base_branch: String,
    /// Whether new pull requests with reviewers are integrated best-effort.
    pub auto_merge: bool,
}

impl Default for SourceControlConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            base_branch: default_base_branch(),
            auto_merge: false,
        }
    }
}

/// Completion model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Model name.
    pub model: String,
    /// Response token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let settings = GeneratorSettings::default();
        Self {
            model: settings.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Tracking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    /// Whether scheduled runs sync approval state into the tracking store.
    pub auto_sync: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { auto_sync: true }
    }
}

/// Scheduler and reviewer-policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Seconds between successful cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds to wait after a failed cycle.
    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,
    /// Whether pull requests opened without reviewers are integrated
    /// immediately.
    #[serde(default = "default_auto_integrate_unreviewed")]
    pub auto_integrate_unreviewed: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            failure_backoff_secs: default_failure_backoff_secs(),
            auto_integrate_unreviewed: default_auto_integrate_unreviewed(),
        }
    }
}

fn default_base_branch() -> String {
    "main".to_owned()
}

const fn default_interval_secs() -> u64 {
    3600
}

const fn default_failure_backoff_secs() -> u64 {
    60
}

const fn default_auto_integrate_unreviewed() -> bool {
    true
}

impl AutomationConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown
    /// keys.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Builds a configuration from defaults and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from defaults and a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::default().with_overrides(lookup)
    }

    /// Overlays variables found by `lookup` onto this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable cannot be parsed.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let overlay = Overlay { lookup: &lookup };

        overlay.string("GITHUB_REPO", &mut self.source_control.repository);
        overlay.string("GITHUB_BASE_BRANCH", &mut self.source_control.base_branch);
        overlay.flag("GITHUB_AUTO_MERGE", &mut self.source_control.auto_merge);

        overlay.string("GROQ_MODEL", &mut self.generator.model);
        overlay.parsed("GROQ_MAX_TOKENS", &mut self.generator.max_tokens)?;
        overlay.parsed("GROQ_TEMPERATURE", &mut self.generator.temperature)?;

        overlay.flag("GOOGLE_SHEETS_AUTO_SYNC", &mut self.tracking.auto_sync);

        overlay.parsed("PRFLOW_INTERVAL_SECS", &mut self.workflow.interval_secs)?;
        overlay.parsed(
            "PRFLOW_FAILURE_BACKOFF_SECS",
            &mut self.workflow.failure_backoff_secs,
        )?;
        overlay.flag(
            "PRFLOW_AUTO_INTEGRATE_UNREVIEWED",
            &mut self.workflow.auto_integrate_unreviewed,
        );
        Ok(self)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let repository = self.source_control.repository.as_str();
        let well_formed = repository
            .split_once('/')
            .is_some_and(|(owner, name)| {
                !owner.trim().is_empty() && !name.trim().is_empty() && !name.contains('/')
            });
        if !well_formed {
            return Err(ConfigError::InvalidRepository(repository.to_owned()));
        }
        if self.source_control.base_branch.trim().is_empty() {
            return Err(ConfigError::EmptyBaseBranch);
        }
        if self.generator.max_tokens == 0 {
            return Err(ConfigError::Zero("max_tokens"));
        }
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(ConfigError::InvalidTemperature(self.generator.temperature));
        }
        if self.workflow.interval_secs == 0 {
            return Err(ConfigError::Zero("interval_secs"));
        }
        if self.workflow.failure_backoff_secs == 0 {
            return Err(ConfigError::Zero("failure_backoff_secs"));
        }
        Ok(())
    }

    /// Returns orchestrator settings.
    #[must_use]
    pub fn automation_settings(&self) -> AutomationSettings {
        let policy = if self.workflow.auto_integrate_unreviewed {
            ReviewerPolicy::AutoIntegrateUnreviewed
        } else {
            ReviewerPolicy::LeavePending
        };
        AutomationSettings::new(self.source_control.repository.clone())
            .with_reviewer_policy(policy)
            .with_tracking_sync(self.tracking.auto_sync)
    }

    /// Returns completion settings.
    #[must_use]
    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            model: self.generator.model.clone(),
            max_tokens: self.generator.max_tokens,
            temperature: self.generator.temperature,
        }
    }

    /// Returns scheduler timing.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.workflow.interval_secs),
            failure_backoff: Duration::from_secs(self.workflow.failure_backoff_secs),
        }
    }

    /// Starts a creation request for `branch` using the configured base
    /// branch and auto-merge default.
    #[must_use]
    pub fn pull_request_for(&self, branch: impl Into<String>) -> CreatePullRequestRequest {
        CreatePullRequestRequest::new(branch, self.source_control.base_branch.clone())
            .with_auto_merge(self.source_control.auto_merge)
    }
}

struct Overlay<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    lookup: &'a F,
}

impl<F> Overlay<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn value(&self, variable: &str) -> Option<String> {
        (self.lookup)(variable).filter(|value| !value.trim().is_empty())
    }

    fn string(&self, variable: &str, target: &mut String) {
        if let Some(value) = self.value(variable) {
            *target = value.trim().to_owned();
        }
    }

    /// Only a case-insensitive `true` enables a flag.
    fn flag(&self, variable: &str, target: &mut bool) {
        if let Some(value) = self.value(variable) {
            *target = value.trim().eq_ignore_ascii_case("true");
        }
    }

    fn parsed<T>(&self, variable: &'static str, target: &mut T) -> Result<(), ConfigError>
    where
        T: std::str::FromStr,
    {
        if let Some(value) = self.value(variable) {
            let parsed = value.trim().parse::<T>();
            *target = parsed.map_err(|_| ConfigError::InvalidValue { variable, value })?;
        }
        Ok(())
    }
}
