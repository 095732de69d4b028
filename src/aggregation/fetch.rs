use super::error::{panic_message, FetchError};
use crate::library::{Member, Track};
use crate::metrics;
use crate::sources::LibrarySource;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Outcome of fetching one member's library.
#[derive(Debug)]
pub struct FetchResult {
    pub member: Member,
    pub outcome: Result<Vec<Track>, FetchError>,
}

impl FetchResult {
    pub fn is_err(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Fetch a member's library, converting every fault into a [`FetchError`].
///
/// Panics raised anywhere inside the source are captured here and never
/// reach the coordinator or sibling workers.
pub async fn fetch_member_library(
    source: Arc<dyn LibrarySource>,
    member: Member,
    run_id: &str,
) -> FetchResult {
    let outcome = match AssertUnwindSafe(source.fetch_all_tracks(&member))
        .catch_unwind()
        .await
    {
        Ok(Ok(tracks)) => {
            info!(
                "[{}] Fetched {} tracks for member {}",
                run_id,
                tracks.len(),
                member.id
            );
            Ok(tracks)
        }
        Ok(Err(e)) => {
            error!(
                "[{}] Failed to fetch library of member {}: {:#}",
                run_id, member.id, e
            );
            Err(FetchError::Source {
                member: member.id.clone(),
                message: format!("{:#}", e),
            })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                "[{}] Fetch worker for member {} panicked: {}",
                run_id, member.id, message
            );
            Err(FetchError::Panicked {
                member: member.id.clone(),
                message,
            })
        }
    };

    if outcome.is_err() {
        metrics::record_member_fetch_failure();
    }

    FetchResult { member, outcome }
}

/// Worker body: fetch one member's library and submit exactly one result.
///
/// The channel is expected to have room for every worker's result, so the
/// send never waits on the coordinator.
pub async fn fetch_worker(
    source: Arc<dyn LibrarySource>,
    member: Member,
    run_id: String,
    tx: mpsc::Sender<FetchResult>,
) {
    let result = fetch_member_library(source, member, &run_id).await;
    if let Err(e) = tx.send(result).await {
        // Coordinator is gone, most likely because the run expired
        info!(
            "[{}] Dropping fetch result for member {}: coordinator stopped",
            run_id, e.0.member.id
        );
    }
}
