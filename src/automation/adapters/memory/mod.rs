//! In-memory adapters for tests and local runs.

mod completion;
mod source_control;
mod tracking_store;

pub use completion::ScriptedCompletionClient;
pub use source_control::InMemorySourceControl;
pub use tracking_store::InMemoryTrackingStore;
