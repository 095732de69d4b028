//! Processing status of an aggregation run.
//!
//! The status is written only by the run coordinator and read by callers as
//! snapshots. `success` moves from `None` to `Some(_)` exactly once per run.

use super::playlists::PlaylistSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Coarse lifecycle phase derived from a [`ProcessingStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::NotStarted => "not_started",
            RunPhase::InProgress => "in_progress",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    /// Number of members whose libraries are fetched in this run.
    pub total_to_process: usize,
    /// Number of member results consumed so far, successful or not.
    pub already_processed: usize,
    pub started: bool,
    pub started_at: DateTime<Utc>,
    /// Last time the coordinator reported progress.
    pub checkpoint_at: DateTime<Utc>,
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            total_to_process: 0,
            already_processed: 0,
            started: false,
            started_at: now,
            checkpoint_at: now,
            success: None,
            failure_reason: None,
        }
    }
}

impl ProcessingStatus {
    /// Status of a run that has just been started for `total_to_process` members.
    pub fn started(total_to_process: usize) -> Self {
        Self {
            total_to_process,
            started: true,
            ..Default::default()
        }
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn has_finished(&self) -> bool {
        self.success.is_some()
    }

    pub fn has_failed(&self) -> bool {
        self.success == Some(false)
    }

    pub fn has_succeeded(&self) -> bool {
        self.success == Some(true)
    }

    pub fn phase(&self) -> RunPhase {
        match (self.started, self.success) {
            (_, Some(true)) => RunPhase::Succeeded,
            (_, Some(false)) => RunPhase::Failed,
            (true, None) => RunPhase::InProgress,
            (false, None) => RunPhase::NotStarted,
        }
    }

    /// Time between the start of the run and its last checkpoint.
    pub fn processing_time(&self) -> chrono::Duration {
        self.checkpoint_at - self.started_at
    }

    /// An unfinished run whose last checkpoint is older than `stale_after`.
    pub fn has_timed_out(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        if !self.started || self.has_finished() {
            return false;
        }
        let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
        now - self.checkpoint_at > stale_after
    }

    /// Record the terminal outcome. Returns false if the run had already finished.
    pub(crate) fn finish(&mut self, success: bool, failure_reason: Option<String>) -> bool {
        if self.success.is_some() {
            return false;
        }
        self.success = Some(success);
        if !success {
            self.failure_reason = failure_reason;
        }
        true
    }
}

/// Everything callers can observe about the current run.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunSnapshot {
    pub run_id: Option<String>,
    pub status: ProcessingStatus,
    pub playlists: Option<Arc<PlaylistSet>>,
    /// Cancels the in-flight run.
    pub cancel: Option<CancellationToken>,
}

/// Write access to the snapshot of a single run.
///
/// Writes are ignored once another run has replaced the snapshot, so a late
/// coordinator can never clobber its successor.
#[derive(Clone)]
pub(crate) struct StatusTracker {
    run_id: String,
    tx: Arc<watch::Sender<RunSnapshot>>,
}

impl StatusTracker {
    pub fn new(run_id: String, tx: Arc<watch::Sender<RunSnapshot>>) -> Self {
        Self { run_id, tx }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> ProcessingStatus {
        self.tx.borrow().status.clone()
    }

    fn is_current(&self, snapshot: &RunSnapshot) -> bool {
        snapshot.run_id.as_deref() == Some(self.run_id.as_str())
    }

    /// Apply `f` to the status of this run if it is still the current one.
    pub fn update(&self, f: impl FnOnce(&mut ProcessingStatus)) -> ProcessingStatus {
        self.tx.send_if_modified(|snapshot| {
            if !self.is_current(snapshot) || snapshot.status.has_finished() {
                return false;
            }
            f(&mut snapshot.status);
            true
        });
        self.status()
    }

    /// Status this run ends with, not yet visible to readers.
    pub fn terminal_status(
        &self,
        success: bool,
        failure_reason: Option<String>,
    ) -> ProcessingStatus {
        let mut status = self.status();
        status.finish(success, failure_reason);
        status.checkpoint_at = Utc::now();
        status
    }

    /// Publish a terminal status. Playlists are published in the same update
    /// as `success`, so a reader that sees the run finished also sees its
    /// output. Returns false if the transition was ignored.
    pub fn finish(&self, status: ProcessingStatus, playlists: Option<Arc<PlaylistSet>>) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if !self.is_current(snapshot)
                || snapshot.status.has_finished()
                || !status.has_finished()
            {
                return false;
            }
            if status.has_succeeded() {
                snapshot.playlists = playlists;
            }
            snapshot.status = status;
            snapshot.cancel = None;
            true
        })
    }
}
