use crate::aggregation::ProcessingStatus;
use crate::library::{Member, MemberId};
use serde::{Deserialize, Serialize};

/// Persisted state of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub room_id: String,
    pub members: Vec<MemberId>,
    pub status: ProcessingStatus,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, room_id: impl Into<String>, members: &[Member]) -> Self {
        Self {
            run_id: run_id.into(),
            room_id: room_id.into(),
            members: members.iter().map(|m| m.id.clone()).collect(),
            status: ProcessingStatus::started(members.len()),
        }
    }
}
