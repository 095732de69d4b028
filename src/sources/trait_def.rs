//! Capabilities consumed by the aggregation engine.
//!
//! Fetching libraries and enrichment metadata, as well as persisting run
//! progress, are provided by collaborators outside the engine. They are
//! injected as trait objects so that the engine never reaches for ambient
//! state.

use crate::aggregation::{ProcessingStatus, SharedPlaylist};
use crate::library::{EnrichmentBatch, Member, Track};
use anyhow::Result;
use async_trait::async_trait;

/// Source of member libraries and track metadata.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    /// Full snapshot of a member's library. May be slow; called once per
    /// member per run.
    async fn fetch_all_tracks(&self, member: &Member) -> Result<Vec<Track>>;

    /// Batched metadata lookup keyed by content identifier. Only ever called
    /// with the reduced shared set.
    async fn fetch_enrichment(&self, tracks: &[Track]) -> Result<EnrichmentBatch>;
}

/// Hooks invoked by the run coordinator.
#[async_trait]
pub trait RunObserver: Send + Sync {
    /// Called once before any fetch worker is launched.
    async fn on_start(&self, _run_id: &str, _members: &[Member]) -> Result<()> {
        Ok(())
    }

    /// Progress report. Failures are logged and never abort the run.
    async fn checkpoint(&self, run_id: &str, status: &ProcessingStatus) -> Result<()>;

    /// Called exactly once per run when it reaches a terminal state.
    /// `playlists` is empty unless the run succeeded.
    async fn on_complete(
        &self,
        run_id: &str,
        status: &ProcessingStatus,
        playlists: &[SharedPlaylist],
    );
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunObserver;

#[async_trait]
impl RunObserver for NoopRunObserver {
    async fn checkpoint(&self, _run_id: &str, _status: &ProcessingStatus) -> Result<()> {
        Ok(())
    }

    async fn on_complete(
        &self,
        _run_id: &str,
        _status: &ProcessingStatus,
        _playlists: &[SharedPlaylist],
    ) {
    }
}
