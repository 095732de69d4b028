use crate::library::MemberId;
use thiserror::Error;

/// Usage faults reported to callers of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No members to aggregate")]
    NoMembers,

    #[error("Aggregation is already running")]
    AlreadyRunning,

    #[error("Aggregation already completed successfully")]
    AlreadyProcessed,

    #[error("Aggregation has not been started")]
    NotStarted,

    #[error("Aggregation is still in progress")]
    InProgress,

    #[error("Aggregation failed")]
    Failed,

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),
}

/// Fault while fetching a single member's library.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to fetch library of member {member}: {message}")]
    Source { member: MemberId, message: String },

    #[error("Fetch worker for member {member} panicked: {message}")]
    Panicked { member: MemberId, message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Enrichment fetch failed: {0}")]
pub struct EnrichmentError(pub String);

/// Reasons a run ends in the failed terminal state.
#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("Library fetch failed for {} member(s): {}", .0.len(), join_ids(.0))]
    MemberFetchFailed(Vec<MemberId>),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    #[error("Fetch workers stopped after {received} of {expected} results")]
    WorkersVanished { received: usize, expected: usize },

    #[error("Run expired")]
    Expired,
}

fn join_ids(ids: &[MemberId]) -> String {
    ids.iter()
        .map(MemberId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Best-effort text of a captured panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
