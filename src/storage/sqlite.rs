use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::state::PageState;
use crate::storage::schema::initialize_schema;
use crate::storage::{RunRecord, RunStatus, StorageError, StorageResult};

/// SQLite-backed resume state
///
/// All writes go through the coordinator's drive loop, so the store is
/// plain mutable state rather than a shared handle.
pub struct ResumeStore {
    conn: Connection,
}

impl ResumeStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Runs =====

    /// Opens a new run, demoting any run still marked running to
    /// interrupted first
    pub fn begin_run(&mut self, session_id: &str) -> StorageResult<i64> {
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        self.conn.execute(
            "INSERT INTO runs (session_id, started_at, status) VALUES (?1, ?2, ?3)",
            params![
                session_id,
                Utc::now().to_rfc3339(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Utc::now().to_rfc3339(), run_id],
        )?;
        Ok(())
    }

    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, session_id, started_at, finished_at, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        started_at: row.get(2)?,
                        finished_at: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)
    }

    // ===== Visited URLs =====

    pub fn record_visited(&mut self, url: &str, run_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO visited_urls (url, run_id) VALUES (?1, ?2)",
            params![url, run_id],
        )?;
        Ok(())
    }

    pub fn load_visited(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM visited_urls")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }

    // ===== Fingerprints =====

    pub fn record_fingerprints(&mut self, fingerprints: &[String], run_id: i64) -> StorageResult<()> {
        if fingerprints.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO fingerprints (fingerprint, run_id) VALUES (?1, ?2)",
            )?;
            for fingerprint in fingerprints {
                stmt.execute(params![fingerprint, run_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_fingerprints(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT fingerprint FROM fingerprints")?;
        let fingerprints = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(fingerprints)
    }

    // ===== Page states =====

    /// Records the latest state of one URL, replacing any earlier state
    pub fn record_page_state(
        &mut self,
        url: &str,
        state: PageState,
        status_code: Option<u16>,
        content_type: Option<&str>,
        error_message: Option<&str>,
        run_id: i64,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, state, status_code, content_type, error_message, updated_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(url) DO UPDATE SET
                 state = excluded.state,
                 status_code = excluded.status_code,
                 content_type = excluded.content_type,
                 error_message = excluded.error_message,
                 updated_at = excluded.updated_at,
                 run_id = excluded.run_id",
            params![
                url,
                state.to_db_string(),
                status_code,
                content_type,
                error_message,
                Utc::now().to_rfc3339(),
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Page counts per state, for the end-of-run summary
    pub fn state_counts(&self) -> StorageResult<Vec<(PageState, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM pages GROUP BY state ORDER BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (state, count) = row?;
            if let Some(state) = PageState::from_db_string(&state) {
                counts.push((state, count as u64));
            }
        }
        Ok(counts)
    }

    /// Drops visited URLs, fingerprints, and page states for a fresh
    /// crawl; run history stays
    pub fn fresh_start(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM visited_urls", [])?;
        tx.execute("DELETE FROM fingerprints", [])?;
        tx.execute("DELETE FROM pages", [])?;
        tx.commit()?;
        Ok(())
    }
}
