//! End-to-end tests for file-backed libraries and the runs database
//!
//! Runs the engine over JSON library snapshots on disk and checks what ends
//! up persisted in SQLite.

mod common;

use common::{
    genre, isrc, member, popularity, tracks, write_enrichment, write_library, GENRE_ROCK,
    MEMBER_X, MEMBER_Y, MEMBER_Z, ROOM_ID,
};
use shared_playlists::{
    AggregationSettings, FileLibrarySource, PlaylistType, RunStore, SharedLibrary,
    SqliteRunStore, StoreRunObserver,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    store: Arc<SqliteRunStore>,
    engine: SharedLibrary,
}

impl Fixture {
    fn new(dir: TempDir) -> Self {
        let store = Arc::new(SqliteRunStore::new(dir.path().join("runs.db")).unwrap());
        let engine = SharedLibrary::new(
            Arc::new(FileLibrarySource::new(dir.path())),
            Arc::new(StoreRunObserver::new(store.clone(), ROOM_ID)),
            AggregationSettings::default(),
        )
        .unwrap();
        Self {
            _dir: dir,
            store,
            engine,
        }
    }
}

#[tokio::test]
async fn test_successful_run_is_persisted() {
    let dir = TempDir::new().unwrap();
    write_library(dir.path(), MEMBER_X, &tracks(1..=6)).unwrap();
    write_library(dir.path(), MEMBER_Y, &tracks(1..=6)).unwrap();
    let mut enrichment = HashMap::new();
    for n in 1..=5 {
        let mut record = genre(n, GENRE_ROCK);
        record.popularity = popularity(80).popularity;
        enrichment.insert(isrc(n), record);
    }
    write_enrichment(dir.path(), &enrichment).unwrap();
    let fixture = Fixture::new(dir);

    let run_id = fixture
        .engine
        .start(vec![member(MEMBER_X), member(MEMBER_Y)])
        .unwrap();
    let status = fixture.engine.wait_until_finished().await;
    assert!(status.has_succeeded());

    let run = fixture.store.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.room_id, ROOM_ID);
    assert_eq!(run.members.len(), 2);
    assert!(run.status.has_succeeded());
    assert_eq!(run.status.already_processed, 2);

    let persisted = fixture.store.get_playlists(&run_id).unwrap();
    let in_memory = fixture.engine.get_playlists().unwrap();
    assert_eq!(persisted.len(), in_memory.len());
    for (stored, live) in persisted.iter().zip(&in_memory) {
        assert_eq!(stored.summary(), live.summary());
        assert_eq!(stored.tracks_per_shared_count, live.tracks_per_shared_count);
    }

    let popular = persisted
        .iter()
        .find(|p| p.playlist_type == PlaylistType::Popular)
        .unwrap();
    assert_eq!(popular.shared_track_count, 5);
    assert!(persisted
        .iter()
        .any(|p| p.playlist_type == PlaylistType::Genre));

    assert_eq!(
        fixture
            .store
            .latest_successful_run(ROOM_ID)
            .unwrap()
            .unwrap()
            .run_id,
        run_id
    );
    assert!(fixture.store.list_unfinished_runs().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_library_fails_and_is_persisted() {
    let dir = TempDir::new().unwrap();
    write_library(dir.path(), MEMBER_X, &tracks(1..=3)).unwrap();
    write_library(dir.path(), MEMBER_Y, &tracks(1..=3)).unwrap();
    // No library file for member z
    let fixture = Fixture::new(dir);

    let run_id = fixture
        .engine
        .start(vec![member(MEMBER_X), member(MEMBER_Y), member(MEMBER_Z)])
        .unwrap();
    let status = fixture.engine.wait_until_finished().await;
    assert!(status.has_failed());

    let run = fixture.store.get_run(&run_id).unwrap().unwrap();
    assert!(run.status.has_failed());
    assert!(run.status.failure_reason.unwrap().contains(MEMBER_Z));
    assert!(fixture.store.get_playlists(&run_id).unwrap().is_empty());
    assert!(fixture.store.latest_successful_run(ROOM_ID).unwrap().is_none());

    assert_eq!(fixture.store.delete_failed_runs(ROOM_ID).unwrap(), 1);
    assert!(fixture.store.get_run(&run_id).unwrap().is_none());
}

#[tokio::test]
async fn test_runs_database_survives_reopen() {
    let dir = TempDir::new().unwrap();
    write_library(dir.path(), MEMBER_X, &tracks(1..=2)).unwrap();
    write_library(dir.path(), MEMBER_Y, &tracks(1..=2)).unwrap();
    let db_path = dir.path().join("runs.db");
    let fixture = Fixture::new(dir);

    let run_id = fixture
        .engine
        .start(vec![member(MEMBER_X), member(MEMBER_Y)])
        .unwrap();
    fixture.engine.wait_until_finished().await;

    let reopened = SqliteRunStore::new(&db_path).unwrap();
    let run = reopened.get_run(&run_id).unwrap().unwrap();
    assert!(run.status.has_succeeded());
    assert_eq!(
        reopened.get_playlists(&run_id).unwrap().len(),
        fixture.engine.get_playlists().unwrap().len()
    );
}
