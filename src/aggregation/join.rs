//! Run coordinator: fans out one fetch worker per member, joins exactly one
//! result per member into the rank table and drives the run to a terminal
//! state.

use super::derive::derive_playlists;
use super::error::{panic_message, RunError};
use super::fetch::{fetch_worker, FetchResult};
use super::playlists::{PlaylistSet, PlaylistType, SharedPlaylist};
use super::rank_table::RankTable;
use super::status::StatusTracker;
use crate::config::AggregationSettings;
use crate::library::Member;
use crate::metrics;
use crate::sources::{LibrarySource, RunObserver};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a single run needs, moved into the coordinator task.
pub(crate) struct RunContext {
    pub tracker: StatusTracker,
    pub members: Vec<Member>,
    pub source: Arc<dyn LibrarySource>,
    pub observer: Arc<dyn RunObserver>,
    pub settings: AggregationSettings,
    pub cancel: CancellationToken,
}

impl RunContext {
    fn run_id(&self) -> &str {
        self.tracker.run_id()
    }

    /// Refresh the checkpoint time and report progress to the observer.
    async fn checkpoint(&self) {
        let status = self.tracker.update(|s| s.checkpoint_at = Utc::now());
        if let Err(e) = self.observer.checkpoint(self.run_id(), &status).await {
            warn!("[{}] Checkpoint failed: {:#}", self.run_id(), e);
        }
    }
}

/// Drive a run to its terminal state.
///
/// Never leaves the status unfinished: errors, expiry and panics inside the
/// coordinator all end the run as failed. The observer is notified exactly
/// once, before the terminal status becomes visible to readers. A panic in
/// that notification is logged and leaves the outcome unchanged.
pub(crate) async fn run_aggregation(ctx: RunContext) {
    let started = Instant::now();
    let run_id = ctx.run_id().to_string();
    info!(
        "[{}] Aggregation started for {} members",
        run_id,
        ctx.members.len()
    );

    let guarded = async {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(RunError::Expired),
            result = coordinate(&ctx) => result,
        }
    };

    let (playlists, failure_reason, outcome_label) =
        match AssertUnwindSafe(guarded).catch_unwind().await {
            Ok(Ok(playlists)) => (Some(Arc::new(playlists)), None, "success"),
            Ok(Err(RunError::Expired)) => {
                warn!("[{}] Run expired before completion", run_id);
                (None, Some(RunError::Expired.to_string()), "expired")
            }
            Ok(Err(e)) => {
                error!("[{}] Run failed: {}", run_id, e);
                (None, Some(e.to_string()), "failed")
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("[{}] Coordinator panicked: {}", run_id, message);
                (None, Some(format!("Task panic: {}", message)), "panic")
            }
        };

    let success = playlists.is_some();
    let status = ctx.tracker.terminal_status(success, failure_reason);
    let sorted: Vec<SharedPlaylist> = playlists
        .as_deref()
        .map(|set| set.sorted().into_iter().cloned().collect())
        .unwrap_or_default();

    // The terminal status is published even when the observer panics
    let notified = ctx.observer.on_complete(&run_id, &status, &sorted);
    if let Err(payload) = AssertUnwindSafe(notified).catch_unwind().await {
        error!(
            "[{}] Observer panicked on completion: {}",
            run_id,
            panic_message(payload.as_ref())
        );
    }

    if let Some(set) = playlists.as_deref() {
        let shared = set
            .find_by_type(PlaylistType::Shared)
            .first()
            .map_or(0, |p| p.shared_track_count);
        metrics::set_shared_tracks(shared);
    }
    metrics::record_run_finished(outcome_label, started.elapsed());

    if !ctx.tracker.finish(status, playlists) {
        warn!("[{}] Terminal status ignored, run was replaced", run_id);
    }
    info!(
        "[{}] Aggregation finished ({}) in {:?}",
        run_id,
        outcome_label,
        started.elapsed()
    );
}

/// Fan out, join and derive. Runs inside the coordinator fault boundary.
async fn coordinate(ctx: &RunContext) -> Result<PlaylistSet, RunError> {
    let run_id = ctx.run_id();
    let expected = ctx.members.len();

    if let Err(e) = ctx.observer.on_start(run_id, &ctx.members).await {
        warn!("[{}] Failed to record run start: {:#}", run_id, e);
    }
    ctx.checkpoint().await;

    // One slot per member: no worker ever waits to hand over its result
    let (tx, mut rx) = mpsc::channel::<FetchResult>(expected.max(1));
    // Dropping the set aborts workers still running
    let mut workers = JoinSet::new();
    for member in &ctx.members {
        workers.spawn(fetch_worker(
            Arc::clone(&ctx.source),
            member.clone(),
            run_id.to_string(),
            tx.clone(),
        ));
    }
    drop(tx);

    let mut rank_table = RankTable::new();
    let mut failed_members = Vec::new();
    let mut received = 0;

    while received < expected {
        let Some(result) = rx.recv().await else {
            return Err(RunError::WorkersVanished { received, expected });
        };
        received += 1;

        match result.outcome {
            Ok(tracks) if failed_members.is_empty() => {
                let stats = rank_table.add_member_tracks(&result.member, &tracks);
                debug!(
                    "[{}] Merged member {}: {} distinct, {} duplicates, {} unresolved",
                    run_id, result.member.id, stats.distinct, stats.duplicates, stats.unresolved
                );
            }
            Ok(_) => {
                debug!(
                    "[{}] Run already failed, discarding library of member {}",
                    run_id, result.member.id
                );
            }
            Err(_) => failed_members.push(result.member.id),
        }

        ctx.tracker.update(|s| s.already_processed = received);
        info!("[{}] Processed {}/{} members", run_id, received, expected);
        ctx.checkpoint().await;
    }
    drop(workers);

    if !failed_members.is_empty() {
        return Err(RunError::MemberFetchFailed(failed_members));
    }

    let playlists =
        derive_playlists(rank_table, ctx.source.as_ref(), &ctx.settings, run_id).await?;
    ctx.checkpoint().await;
    Ok(playlists)
}
