//! In-memory tracking store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::automation::{
    domain::{PullRequestNumber, RowHandle, TrackingRow, TrackingUpdate},
    ports::{TrackingStore, TrackingStoreError, TrackingStoreResult},
};

/// Thread-safe row-oriented tracking store.
///
/// Rows keep insertion order, mirroring a worksheet without its header row,
/// and are indexed by pull request number. Lookups and writes share a single
/// writer lock, so an upsert can never append a second row for the same pull
/// request. Handed-out [`RowHandle`]s are checked against the row they
/// address before every write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrackingStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<TrackingRow>,
    index: HashMap<PullRequestNumber, usize>,
}

impl InMemoryTrackingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> TrackingStoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| TrackingStoreError::persistence(std::io::Error::other(e.to_string())))
    }

    fn write_state(&self) -> TrackingStoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| TrackingStoreError::persistence(std::io::Error::other(e.to_string())))
    }
}

impl StoreState {
    fn row_mut(&mut self, handle: RowHandle) -> TrackingStoreResult<&mut TrackingRow> {
        let row = self
            .rows
            .get_mut(handle.position())
            .ok_or(TrackingStoreError::RowNotFound(handle))?;
        if row.pr_number != handle.pr_number() {
            return Err(TrackingStoreError::StaleHandle {
                handle,
                current: row.pr_number,
            });
        }
        Ok(row)
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn upsert_row(
        &self,
        pr_number: PullRequestNumber,
        update: &TrackingUpdate,
    ) -> TrackingStoreResult<RowHandle> {
        let mut state = self.write_state()?;

        if let Some(&position) = state.index.get(&pr_number) {
            let handle = RowHandle::new(position, pr_number);
            state.row_mut(handle)?.apply(update);
            return Ok(handle);
        }

        let position = state.rows.len();
        state.rows.push(TrackingRow::from_update(pr_number, update));
        state.index.insert(pr_number, position);
        Ok(RowHandle::new(position, pr_number))
    }

    async fn find_row(
        &self,
        pr_number: PullRequestNumber,
    ) -> TrackingStoreResult<Option<RowHandle>> {
        let state = self.read_state()?;
        Ok(state
            .index
            .get(&pr_number)
            .map(|&position| RowHandle::new(position, pr_number)))
    }

    async fn update_fields(
        &self,
        row: RowHandle,
        update: &TrackingUpdate,
    ) -> TrackingStoreResult<()> {
        let mut state = self.write_state()?;
        state.row_mut(row)?.apply(update);
        Ok(())
    }

    async fn clear_all(&self) -> TrackingStoreResult<u32> {
        let mut state = self.write_state()?;
        let cleared = u32::try_from(state.rows.len()).unwrap_or(u32::MAX);
        state.rows.clear();
        state.index.clear();
        Ok(cleared)
    }

    async fn read_all(&self) -> TrackingStoreResult<Vec<TrackingRow>> {
        Ok(self.read_state()?.rows.clone())
    }
}
