//! Tracking store port for row-oriented pull request tracking state.

use crate::automation::domain::{PullRequestNumber, RowHandle, TrackingRow, TrackingUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for tracking store operations.
pub type TrackingStoreResult<T> = Result<T, TrackingStoreError>;

/// Tracking persistence contract.
///
/// Rows are keyed by pull request number. Stores address rows by position,
/// so [`RowHandle`]s must be re-derived with [`TrackingStore::find_row`]
/// before each mutation rather than cached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Updates the row for `pr_number`, creating it when absent.
    ///
    /// The lookup and the write happen atomically, so repeated upserts never
    /// create a second row for the same number.
    async fn upsert_row(
        &self,
        pr_number: PullRequestNumber,
        update: &TrackingUpdate,
    ) -> TrackingStoreResult<RowHandle>;

    /// Locates the row for `pr_number`.
    ///
    /// Returns `None` when the pull request is not tracked.
    async fn find_row(
        &self,
        pr_number: PullRequestNumber,
    ) -> TrackingStoreResult<Option<RowHandle>>;

    /// Writes fields to a located row.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingStoreError::RowNotFound`] when the handle no longer
    /// addresses a row and [`TrackingStoreError::StaleHandle`] when its
    /// position now holds a different pull request.
    async fn update_fields(
        &self,
        row: RowHandle,
        update: &TrackingUpdate,
    ) -> TrackingStoreResult<()>;

    /// Removes every row and returns how many were removed.
    async fn clear_all(&self) -> TrackingStoreResult<u32>;

    /// Reads every row in store order.
    async fn read_all(&self) -> TrackingStoreResult<Vec<TrackingRow>>;
}

/// Errors returned by tracking store implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackingStoreError {
    /// The handle does not address a row.
    #[error("tracking {0} not found")]
    RowNotFound(RowHandle),

    /// The handle's position was reused for another pull request.
    #[error("tracking {handle} is stale: the row now holds PR {current}")]
    StaleHandle {
        /// Handle presented by the caller.
        handle: RowHandle,
        /// Pull request currently stored at that position.
        current: PullRequestNumber,
    },

    /// Persistence-layer failure.
    #[error("tracking persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrackingStoreError {
    /// Returns whether the handle no longer addresses its pull request's row.
    #[must_use]
    pub const fn is_stale_handle(&self) -> bool {
        matches!(self, Self::RowNotFound(_) | Self::StaleHandle { .. })
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
