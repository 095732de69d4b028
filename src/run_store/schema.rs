//! SQLite schema definitions for the runs database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Runs and their playlists
// =============================================================================

/// One row per aggregation run. `success` is NULL while the run is unfinished.
const RUNS_TABLE_V1: Table = Table {
    name: "runs",
    columns: &[
        sqlite_column!("run_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("room_id", &SqlType::Text, non_null = true),
        sqlite_column!("members", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("total_to_process", &SqlType::Integer, non_null = true),
        sqlite_column!("already_processed", &SqlType::Integer, non_null = true),
        sqlite_column!("started", &SqlType::Integer, non_null = true),
        sqlite_column!("success", &SqlType::Integer),
        sqlite_column!("failure_reason", &SqlType::Text),
        sqlite_column!("started_at", &SqlType::Text, non_null = true),
        sqlite_column!("checkpoint_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_runs_room_id", "room_id"),
        ("idx_runs_success", "success"),
    ],
};

/// Playlists produced by successful runs, stored as JSON documents.
const PLAYLISTS_TABLE_V1: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("run_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true),
        sqlite_column!("rank", &SqlType::Integer, non_null = true),
        sqlite_column!("shared_track_count", &SqlType::Integer, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_playlists_run_id", "run_id")],
};

// =============================================================================
// Version 2 - Order of playlists within a type
// =============================================================================

const PLAYLISTS_TABLE_V2: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("run_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true),
        sqlite_column!("rank", &SqlType::Integer, non_null = true),
        sqlite_column!("shared_track_count", &SqlType::Integer, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!(
            "rank_for_type",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[("idx_playlists_run_id", "run_id")],
};

/// Migration from version 1 to version 2: add playlists.rank_for_type
fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute(
        "ALTER TABLE playlists ADD COLUMN rank_for_type INTEGER NOT NULL DEFAULT 1",
        [],
    )?;
    Ok(())
}

pub const RUNS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[RUNS_TABLE_V1, PLAYLISTS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[RUNS_TABLE_V1, PLAYLISTS_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
    },
];
