//! Explicit store for aggregation runs, keyed by run id.
//!
//! Runs that have not reached a terminal state are tracked here instead of in
//! process memory, so a supervisor can find and discard them after a restart.

mod models;
mod observer;
mod schema;
mod sqlite_run_store;

pub use models::RunRecord;
pub use observer::StoreRunObserver;
pub use schema::RUNS_VERSIONED_SCHEMAS;
pub use sqlite_run_store::SqliteRunStore;

use crate::aggregation::{ProcessingStatus, SharedPlaylist};
use anyhow::Result;

/// Trait for run storage backends.
pub trait RunStore: Send + Sync {
    /// Insert a new run. Fails if the id already exists.
    fn create_run(&self, record: &RunRecord) -> Result<()>;

    /// Overwrite the status of a run. Returns false if the run doesn't exist.
    fn update_run_status(&self, run_id: &str, status: &ProcessingStatus) -> Result<bool>;

    fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>>;

    /// Delete a run and its playlists. Returns false if the run doesn't exist.
    fn delete_run(&self, run_id: &str) -> Result<bool>;

    /// Persist the playlists of a successful run.
    fn save_playlists(&self, run_id: &str, playlists: &[SharedPlaylist]) -> Result<()>;

    /// Playlists of a run, ordered by rank then name.
    fn get_playlists(&self, run_id: &str) -> Result<Vec<SharedPlaylist>>;

    /// Runs without a terminal status.
    fn list_unfinished_runs(&self) -> Result<Vec<RunRecord>>;

    fn latest_successful_run(&self, room_id: &str) -> Result<Option<RunRecord>>;

    /// Delete failed runs of a room. Returns the number of runs deleted.
    fn delete_failed_runs(&self, room_id: &str) -> Result<usize>;
}
