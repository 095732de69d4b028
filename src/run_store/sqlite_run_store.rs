use super::models::RunRecord;
use super::schema::RUNS_VERSIONED_SCHEMAS;
use super::RunStore;
use crate::aggregation::{ProcessingStatus, SharedPlaylist};
use crate::library::MemberId;
use crate::sqlite_persistence::open_versioned;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const RUN_COLUMNS: &str = "run_id, room_id, members, total_to_process, already_processed, \
    started, success, failure_reason, started_at, checkpoint_at";

pub struct SqliteRunStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRunStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open runs database")?;
        if is_new_db {
            info!("Creating new runs database at {:?}", path);
        }
        open_versioned(&mut conn, RUNS_VERSIONED_SCHEMAS, is_new_db, "runs")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, RUNS_VERSIONED_SCHEMAS, true, "runs")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Runs database lock poisoned"))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let members_json: String = row.get("members")?;
        let members: Vec<MemberId> = serde_json::from_str(&members_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        let started_at: String = row.get("started_at")?;
        let checkpoint_at: String = row.get("checkpoint_at")?;

        Ok(RunRecord {
            run_id: row.get("run_id")?,
            room_id: row.get("room_id")?,
            members,
            status: ProcessingStatus {
                total_to_process: row.get::<_, i64>("total_to_process")? as usize,
                already_processed: row.get::<_, i64>("already_processed")? as usize,
                started: row.get::<_, i64>("started")? != 0,
                started_at: Self::parse_datetime(&started_at),
                checkpoint_at: Self::parse_datetime(&checkpoint_at),
                success: row.get::<_, Option<i64>>("success")?.map(|v| v != 0),
                failure_reason: row.get("failure_reason")?,
            },
        })
    }
}

impl RunStore for SqliteRunStore {
    fn create_run(&self, record: &RunRecord) -> Result<()> {
        let conn = self.conn()?;
        let status = &record.status;
        conn.execute(
            &format!(
                "INSERT INTO runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                RUN_COLUMNS
            ),
            params![
                record.run_id,
                record.room_id,
                serde_json::to_string(&record.members)?,
                status.total_to_process as i64,
                status.already_processed as i64,
                status.started,
                status.success,
                status.failure_reason,
                Self::format_datetime(&status.started_at),
                Self::format_datetime(&status.checkpoint_at),
            ],
        )
        .with_context(|| format!("Failed to create run {}", record.run_id))?;
        debug!("Created run {} for room {}", record.run_id, record.room_id);
        Ok(())
    }

    fn update_run_status(&self, run_id: &str, status: &ProcessingStatus) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE runs SET total_to_process = ?1, already_processed = ?2, started = ?3,
                success = ?4, failure_reason = ?5, started_at = ?6, checkpoint_at = ?7
             WHERE run_id = ?8",
            params![
                status.total_to_process as i64,
                status.already_processed as i64,
                status.started,
                status.success,
                status.failure_reason,
                Self::format_datetime(&status.started_at),
                Self::format_datetime(&status.checkpoint_at),
                run_id,
            ],
        )?;
        Ok(updated > 0)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE run_id = ?1", RUN_COLUMNS),
                params![run_id],
                Self::row_to_run,
            )
            .optional()?;
        Ok(record)
    }

    fn delete_run(&self, run_id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM playlists WHERE run_id = ?1", params![run_id])?;
        let deleted = tx.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn save_playlists(&self, run_id: &str, playlists: &[SharedPlaylist]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for playlist in playlists {
            tx.execute(
                "INSERT OR REPLACE INTO playlists
                    (id, run_id, name, type, rank, shared_track_count, body, rank_for_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    playlist.id,
                    run_id,
                    playlist.name,
                    playlist.playlist_type.as_str(),
                    playlist.rank,
                    playlist.shared_track_count as i64,
                    serde_json::to_string(playlist)?,
                    playlist.rank_for_type,
                ],
            )?;
        }
        tx.commit()
            .with_context(|| format!("Failed to save playlists of run {}", run_id))?;
        debug!("Saved {} playlists for run {}", playlists.len(), run_id);
        Ok(())
    }

    fn get_playlists(&self, run_id: &str) -> Result<Vec<SharedPlaylist>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM playlists WHERE run_id = ?1 ORDER BY rank, rank_for_type, name",
        )?;
        let bodies = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).context("Failed to decode stored playlist"))
            .collect()
    }

    fn list_unfinished_runs(&self) -> Result<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM runs WHERE success IS NULL ORDER BY started_at",
            RUN_COLUMNS
        ))?;
        let runs = stmt
            .query_map([], Self::row_to_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn latest_successful_run(&self, room_id: &str) -> Result<Option<RunRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM runs WHERE room_id = ?1 AND success = 1
                     ORDER BY checkpoint_at DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                params![room_id],
                Self::row_to_run,
            )
            .optional()?;
        Ok(record)
    }

    fn delete_failed_runs(&self, room_id: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM playlists WHERE run_id IN
                (SELECT run_id FROM runs WHERE room_id = ?1 AND success = 0)",
            params![room_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM runs WHERE room_id = ?1 AND success = 0",
            params![room_id],
        )?;
        tx.commit()?;
        Ok(deleted)
    }
}
