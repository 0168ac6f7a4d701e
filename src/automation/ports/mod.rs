//! Port contracts for pull request automation.
//!
//! Ports define infrastructure-agnostic interfaces to the source-control
//! host, the completion service and the tracking store.

pub mod completion;
pub mod content_generator;
pub mod source_control;
pub mod tracking_store;

pub use completion::{CompletionClient, CompletionError, CompletionRequest, CompletionResult};
pub use content_generator::ContentGenerator;
pub use source_control::{SourceControlClient, SourceControlError, SourceControlResult};
pub use tracking_store::{TrackingStore, TrackingStoreError, TrackingStoreResult};

#[cfg(test)]
pub use completion::MockCompletionClient;
#[cfg(test)]
pub use content_generator::MockContentGenerator;
#[cfg(test)]
pub use source_control::MockSourceControlClient;
#[cfg(test)]
pub use tracking_store::MockTrackingStore;
