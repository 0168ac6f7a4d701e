//! Chat-completion port used by the completion-backed content generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for completion calls.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// One system-plus-user prompt exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use.
    pub model: String,
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub user: String,
    /// Response token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Raw text completion contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the assistant message text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> CompletionResult<String>;
}

/// Errors returned by completion adapters.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// The service answered without any message content.
    #[error("completion service returned no content")]
    EmptyResponse,

    /// The service answered with a non-success status.
    #[error("completion service returned status {status}: {message}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Service message.
        message: String,
    },

    /// Transport or protocol failure.
    #[error("completion transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl CompletionError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
