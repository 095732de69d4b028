//! Shared Playlists
//!
//! Compares the music libraries of a group of members and derives shared
//! playlists from the tracks they have in common: the base shared set
//! bucketed by how many members hold each track, plus popular, unpopular,
//! dance and per-genre subsets built from enrichment metadata.
//!
//! The library exposes the aggregation engine and its collaborators for the
//! binary and for integration tests.

pub mod aggregation;
pub mod config;
pub mod library;
pub mod metrics;
pub mod run_store;
pub mod sources;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use aggregation::{
    AggregationError, PlaylistSummary, PlaylistType, ProcessingStatus, SharedLibrary,
    SharedPlaylist,
};
pub use config::AggregationSettings;
pub use library::{Member, MemberId, Track};
pub use run_store::{RunStore, SqliteRunStore, StoreRunObserver};
pub use sources::{FileLibrarySource, LibrarySource, NoopRunObserver, RunObserver};
