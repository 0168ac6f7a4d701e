//! Scripted completion client for deterministic generation runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::automation::ports::{
    CompletionClient, CompletionError, CompletionRequest, CompletionResult,
};

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<CompletionResult<String>>,
    requests: Vec<CompletionRequest>,
}

/// Completion client that replays queued responses in order.
///
/// Once the queue is exhausted every call answers
/// [`CompletionError::EmptyResponse`]. Scripting and inspection recover the
/// script from a poisoned lock, so a panicking test thread never discards
/// queued responses or the request log; completion calls report the poison
/// as a transport error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCompletionClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedCompletionClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful completion.
    #[must_use]
    pub fn respond_with(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// Queues a failed completion.
    #[must_use]
    pub fn fail_with(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    /// Returns the requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.recovered_script().requests.clone()
    }

    fn push(&self, response: CompletionResult<String>) {
        self.recovered_script().responses.push_back(response);
    }

    fn recovered_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> CompletionResult<String> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| CompletionError::transport(std::io::Error::other(e.to_string())))?;
        script.requests.push(request.clone());
        script
            .responses
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyResponse))
    }
}
