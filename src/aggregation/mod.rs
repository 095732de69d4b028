//! Shared library aggregation engine.
//!
//! A run fetches every member's library concurrently (one worker per member),
//! joins the results in a single coordinator into a rank table keyed by ISRC,
//! and derives the shared playlist family from the tracks held by at least
//! `min_shared_count` members. Progress is exposed as a [`ProcessingStatus`]
//! whose `success` flag is set exactly once per run.

mod derive;
mod engine;
mod error;
mod fetch;
mod join;
mod playlists;
mod rank_table;
mod status;

pub use derive::{build_shared_buckets, derive_playlists};
pub use engine::SharedLibrary;
pub use error::{AggregationError, EnrichmentError, FetchError};
pub use fetch::{fetch_member_library, fetch_worker, FetchResult};
pub use playlists::{
    genre_playlist_name, MusicPeriod, PlaylistSet, PlaylistSummary, PlaylistType, SharedBuckets,
    SharedPlaylist, PLAYLIST_NAME_DANCE, PLAYLIST_NAME_POPULAR, PLAYLIST_NAME_SHARED,
    PLAYLIST_NAME_UNPOPULAR,
};
pub use rank_table::{MergeStats, RankEntry, RankTable};
pub use status::{ProcessingStatus, RunPhase};
