use super::error::AggregationError;
use anyhow::Context;
use super::join::{run_aggregation, RunContext};
use super::playlists::{PlaylistSet, PlaylistSummary, SharedPlaylist};
use super::status::{ProcessingStatus, RunPhase, RunSnapshot, StatusTracker};
use crate::config::AggregationSettings;
use crate::library::Member;
use crate::metrics;
use crate::sources::{LibrarySource, RunObserver};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared library aggregation engine for a single room.
///
/// Owns at most one run at a time. A run is started with [`start`], observed
/// through [`status`] and, once it succeeded, queried for its playlists.
///
/// [`start`]: SharedLibrary::start
/// [`status`]: SharedLibrary::status
pub struct SharedLibrary {
    source: Arc<dyn LibrarySource>,
    observer: Arc<dyn RunObserver>,
    settings: AggregationSettings,
    state: Arc<watch::Sender<RunSnapshot>>,
}

impl SharedLibrary {
    /// Fails when `settings` do not pass [`AggregationSettings::validate`].
    pub fn new(
        source: Arc<dyn LibrarySource>,
        observer: Arc<dyn RunObserver>,
        settings: AggregationSettings,
    ) -> anyhow::Result<Self> {
        settings
            .validate()
            .context("Invalid aggregation settings")?;
        let (state, _) = watch::channel(RunSnapshot::default());
        Ok(Self {
            source,
            observer,
            settings,
            state: Arc::new(state),
        })
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// Start a run for `members` and return its id.
    ///
    /// Rejected while a run is in progress or after a successful one. A
    /// failed run may be restarted; the new run gets a new id. Must be called
    /// from within a Tokio runtime.
    pub fn start(&self, members: Vec<Member>) -> Result<String, AggregationError> {
        let members = dedup_members(members);
        if members.is_empty() {
            return Err(AggregationError::NoMembers);
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let cancel = CancellationToken::new();
        let mut rejection = None;

        // Check and claim in one update so concurrent starts cannot both win
        self.state.send_if_modified(|snapshot| match snapshot.status.phase() {
            RunPhase::InProgress => {
                rejection = Some(AggregationError::AlreadyRunning);
                false
            }
            RunPhase::Succeeded => {
                rejection = Some(AggregationError::AlreadyProcessed);
                false
            }
            RunPhase::NotStarted | RunPhase::Failed => {
                *snapshot = RunSnapshot {
                    run_id: Some(run_id.clone()),
                    status: ProcessingStatus::started(members.len()),
                    playlists: None,
                    cancel: Some(cancel.clone()),
                };
                true
            }
        });
        if let Some(err) = rejection {
            warn!("Refusing to start aggregation: {}", err);
            return Err(err);
        }

        metrics::record_run_started();
        info!("Starting run {} for {} members", run_id, members.len());

        let ctx = RunContext {
            tracker: StatusTracker::new(run_id.clone(), Arc::clone(&self.state)),
            members,
            source: Arc::clone(&self.source),
            observer: Arc::clone(&self.observer),
            settings: self.settings.clone(),
            cancel,
        };
        tokio::spawn(run_aggregation(ctx));

        Ok(run_id)
    }

    /// Snapshot of the current run's status.
    pub fn status(&self) -> ProcessingStatus {
        self.state.borrow().status.clone()
    }

    pub fn run_id(&self) -> Option<String> {
        self.state.borrow().run_id.clone()
    }

    fn finished_playlists(&self) -> Result<Arc<PlaylistSet>, AggregationError> {
        let snapshot = self.state.borrow();
        match snapshot.status.phase() {
            RunPhase::NotStarted => Err(AggregationError::NotStarted),
            RunPhase::InProgress => Err(AggregationError::InProgress),
            RunPhase::Failed => Err(AggregationError::Failed),
            RunPhase::Succeeded => Ok(snapshot.playlists.clone().unwrap_or_default()),
        }
    }

    pub fn get_playlist(&self, id: &str) -> Result<SharedPlaylist, AggregationError> {
        self.finished_playlists()?
            .get(id)
            .cloned()
            .ok_or_else(|| AggregationError::PlaylistNotFound(id.to_string()))
    }

    /// All playlists of a successful run, ordered by rank then name.
    pub fn get_playlists(&self) -> Result<Vec<SharedPlaylist>, AggregationError> {
        Ok(self
            .finished_playlists()?
            .sorted()
            .into_iter()
            .cloned()
            .collect())
    }

    /// Summaries ordered by rank then name. Empty unless the run succeeded.
    pub fn list_playlist_summaries(&self) -> Vec<PlaylistSummary> {
        self.finished_playlists()
            .map(|set| set.summaries())
            .unwrap_or_default()
    }

    /// Whether the in-flight run has not checkpointed within the staleness window.
    pub fn is_stale(&self) -> bool {
        self.status()
            .has_timed_out(Utc::now(), self.settings.stale_after())
    }

    /// Cancel the in-flight run and wait for it to end as failed.
    /// Returns false when there was nothing to cancel.
    pub async fn expire(&self) -> bool {
        let cancel = {
            let snapshot = self.state.borrow();
            if snapshot.status.phase() != RunPhase::InProgress {
                return false;
            }
            snapshot.cancel.clone()
        };
        let Some(cancel) = cancel else {
            return false;
        };

        warn!(
            "Expiring run {}",
            self.run_id().unwrap_or_else(|| "-".to_string())
        );
        cancel.cancel();
        self.wait_until_finished().await;
        true
    }

    /// Expire the in-flight run if it is stale.
    pub async fn expire_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }
        self.expire().await
    }

    /// Wait until the current run reaches a terminal state and return it.
    /// Returns immediately when no run is in progress.
    pub async fn wait_until_finished(&self) -> ProcessingStatus {
        let mut rx = self.state.subscribe();
        let status = match rx
            .wait_for(|snapshot| snapshot.status.phase() != RunPhase::InProgress)
            .await
        {
            Ok(snapshot) => snapshot.status.clone(),
            Err(_) => self.status(),
        };
        status
    }
}

/// Drop repeated members, keeping the first occurrence.
fn dedup_members(members: Vec<Member>) -> Vec<Member> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|member| {
            let first = seen.insert(member.id.clone());
            if !first {
                warn!("Member {} listed more than once, ignoring repeat", member.id);
            }
            first
        })
        .collect()
}
