use super::{RunRecord, RunStore};
use crate::aggregation::{ProcessingStatus, SharedPlaylist};
use crate::library::Member;
use crate::sources::RunObserver;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Persists run progress and results into a [`RunStore`].
pub struct StoreRunObserver {
    store: Arc<dyn RunStore>,
    room_id: String,
}

impl StoreRunObserver {
    pub fn new(store: Arc<dyn RunStore>, room_id: impl Into<String>) -> Self {
        Self {
            store,
            room_id: room_id.into(),
        }
    }
}

#[async_trait]
impl RunObserver for StoreRunObserver {
    async fn on_start(&self, run_id: &str, members: &[Member]) -> Result<()> {
        self.store
            .create_run(&RunRecord::new(run_id, self.room_id.as_str(), members))
    }

    async fn checkpoint(&self, run_id: &str, status: &ProcessingStatus) -> Result<()> {
        if !self.store.update_run_status(run_id, status)? {
            bail!("Run {} is not in the store", run_id);
        }
        debug!(
            "[{}] Checkpoint stored ({}/{})",
            run_id, status.already_processed, status.total_to_process
        );
        Ok(())
    }

    async fn on_complete(
        &self,
        run_id: &str,
        status: &ProcessingStatus,
        playlists: &[SharedPlaylist],
    ) {
        if status.has_succeeded() {
            if let Err(e) = self.store.save_playlists(run_id, playlists) {
                error!("[{}] Failed to persist playlists: {:#}", run_id, e);
            } else {
                info!("[{}] Persisted {} playlists", run_id, playlists.len());
            }
        }

        match self.store.update_run_status(run_id, status) {
            Ok(true) => {}
            Ok(false) => error!("[{}] Run is not in the store, final status lost", run_id),
            Err(e) => error!("[{}] Failed to persist final status: {:#}", run_id, e),
        }
    }
}
