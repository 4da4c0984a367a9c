use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{DigestSnapshot, JobStatus, Preferences, StatusChange};
use crate::store::{DigestStore, PreferenceStore, SavedJobStore, StatusStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().join("jobtrack.db")
        } else {
            PathBuf::from("jobtrack.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS saved_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL UNIQUE,
                saved_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS job_status (
                job_id INTEGER PRIMARY KEY,
                status TEXT NOT NULL CHECK (status IN ('Not Applied', 'Applied', 'Rejected', 'Selected')),
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS status_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL,
                job_title TEXT NOT NULL,
                job_company TEXT NOT NULL,
                status TEXT NOT NULL,
                changed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS digests (
                date TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                generated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='job_status'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'jobtrack init' first."
            ));
        }
        Ok(())
    }

    fn row_to_change(row: &rusqlite::Row) -> rusqlite::Result<StatusChange> {
        let status: String = row.get(3)?;
        let changed_at: String = row.get(4)?;
        Ok(StatusChange {
            job_id: row.get(0)?,
            job_title: row.get(1)?,
            job_company: row.get(2)?,
            status: parse_status(3, &status)?,
            changed_at: DateTime::parse_from_rfc3339(&changed_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                })?
                .with_timezone(&Utc),
        })
    }
}

fn parse_status(idx: usize, value: &str) -> rusqlite::Result<JobStatus> {
    value.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

// --- Preferences ---

impl PreferenceStore for Database {
    fn preferences(&self) -> Result<Option<Preferences>> {
        let result = self.conn.query_row(
            "SELECT payload FROM preferences WHERE id = 1",
            [],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(payload) => {
                let prefs = serde_json::from_str(&payload).context("Stored preferences are corrupt")?;
                Ok(Some(prefs))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_preferences(&self, prefs: &Preferences) -> Result<()> {
        let payload = serde_json::to_string(prefs)?;
        self.conn.execute(
            "INSERT INTO preferences (id, payload, updated_at) VALUES (1, ?1, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            [payload],
        )?;
        Ok(())
    }

    fn clear_preferences(&self) -> Result<()> {
        self.conn.execute("DELETE FROM preferences", [])?;
        Ok(())
    }
}

// --- Saved jobs ---

impl SavedJobStore for Database {
    fn saved_job_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT job_id FROM saved_jobs ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list saved jobs")
    }

    fn save_job(&self, job_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO saved_jobs (job_id) VALUES (?1)",
            [job_id],
        )?;
        Ok(())
    }

    fn unsave_job(&self, job_id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM saved_jobs WHERE job_id = ?1", [job_id])?;
        Ok(())
    }

    fn is_saved(&self, job_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM saved_jobs WHERE job_id = ?1",
            [job_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

// --- Job status ---

impl StatusStore for Database {
    fn status(&self, job_id: i64) -> Result<Option<JobStatus>> {
        let result = self.conn.query_row(
            "SELECT status FROM job_status WHERE job_id = ?1",
            [job_id],
            |row| {
                let status: String = row.get(0)?;
                parse_status(0, &status)
            },
        );
        match result {
            Ok(status) => Ok(Some(status)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn statuses(&self) -> Result<HashMap<i64, JobStatus>> {
        let mut stmt = self.conn.prepare("SELECT job_id, status FROM job_status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(1)?;
            Ok((row.get::<_, i64>(0)?, parse_status(1, &status)?))
        })?;
        rows.collect::<Result<HashMap<_, _>, _>>()
            .context("Failed to load job statuses")
    }

    fn record_status(&self, change: &StatusChange, history_limit: usize) -> Result<()> {
        let changed_at = change.changed_at.to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO job_status (job_id, status, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(job_id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![change.job_id, change.status.as_str(), changed_at],
        )?;

        tx.execute(
            "INSERT INTO status_history (job_id, job_title, job_company, status, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                change.job_id,
                change.job_title,
                change.job_company,
                change.status.as_str(),
                changed_at
            ],
        )?;

        tx.execute(
            "DELETE FROM status_history WHERE id NOT IN (
                SELECT id FROM status_history ORDER BY id DESC LIMIT ?1
             )",
            [history_limit as i64],
        )?;

        tx.commit().context("Failed to record status change")
    }

    fn history(&self) -> Result<Vec<StatusChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, job_title, job_company, status, changed_at
             FROM status_history ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_change)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to load status history")
    }
}

// --- Digests ---

impl DigestStore for Database {
    fn digest(&self, date: NaiveDate) -> Result<Option<DigestSnapshot>> {
        let key = date.format(DATE_FORMAT).to_string();
        let result = self.conn.query_row(
            "SELECT payload FROM digests WHERE date = ?1",
            [&key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(payload) => {
                let snapshot = serde_json::from_str(&payload)
                    .with_context(|| format!("Stored digest for {} is corrupt", key))?;
                Ok(Some(snapshot))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_digest(&self, snapshot: &DigestSnapshot) -> Result<()> {
        let key = snapshot.date.format(DATE_FORMAT).to_string();
        let payload = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO digests (date, payload, generated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(date) DO UPDATE SET payload = excluded.payload, generated_at = excluded.generated_at",
            params![key, payload],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::generate_digest;
    use crate::scoring::tests::{sample_job, sample_prefs};
    use crate::status::{get_status, set_status, HISTORY_LIMIT};
    use chrono::TimeZone;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_uninitialized_database_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("jobtrack init"));

        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
        // init is repeatable
        db.init().unwrap();
    }

    #[test]
    fn test_preferences_round_trip_and_replace() {
        let db = db();
        assert!(db.preferences().unwrap().is_none());

        db.set_preferences(&sample_prefs()).unwrap();
        assert_eq!(db.preferences().unwrap(), Some(sample_prefs()));

        let replacement = Preferences {
            min_match_score: 70,
            ..Default::default()
        };
        db.set_preferences(&replacement).unwrap();
        assert_eq!(db.preferences().unwrap(), Some(replacement));

        db.clear_preferences().unwrap();
        assert!(db.preferences().unwrap().is_none());
    }

    #[test]
    fn test_saved_jobs_keep_order_without_duplicates() {
        let db = db();
        db.save_job(4).unwrap();
        db.save_job(2).unwrap();
        db.save_job(4).unwrap();
        assert_eq!(db.saved_job_ids().unwrap(), vec![4, 2]);
        assert!(db.is_saved(2).unwrap());

        db.unsave_job(4).unwrap();
        assert_eq!(db.saved_job_ids().unwrap(), vec![2]);
        assert!(!db.is_saved(4).unwrap());
    }

    #[test]
    fn test_status_defaults_and_updates() {
        let db = db();
        let job = sample_job();
        assert_eq!(get_status(&db, job.id).unwrap(), JobStatus::NotApplied);

        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        set_status(&db, &job, JobStatus::Applied, now).unwrap();
        set_status(&db, &job, JobStatus::Selected, now).unwrap();

        assert_eq!(get_status(&db, job.id).unwrap(), JobStatus::Selected);
        assert_eq!(db.statuses().unwrap().get(&job.id), Some(&JobStatus::Selected));

        let history = db.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, JobStatus::Selected);
        assert_eq!(history[1].status, JobStatus::Applied);
        assert_eq!(history[0].changed_at, now);
    }

    #[test]
    fn test_history_trimmed_to_limit() {
        let db = db();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        for id in 1..=25 {
            let mut job = sample_job();
            job.id = id;
            set_status(&db, &job, JobStatus::Rejected, now).unwrap();
        }
        let ids: Vec<i64> = db.history().unwrap().iter().map(|c| c.job_id).collect();
        assert_eq!(ids.len(), HISTORY_LIMIT);
        assert_eq!(ids.first(), Some(&25));
        assert_eq!(ids.last(), Some(&6));
    }

    #[test]
    fn test_digest_absent_empty_and_overwrite() {
        let db = db();
        assert!(db.digest(date()).unwrap().is_none());

        db.put_digest(&DigestSnapshot { date: date(), jobs: Vec::new() }).unwrap();
        assert_eq!(db.digest(date()).unwrap().map(|d| d.jobs.len()), Some(0));

        let snapshot = generate_digest(&[sample_job()], Some(&sample_prefs()), date()).unwrap();
        db.put_digest(&snapshot).unwrap();
        assert_eq!(db.digest(date()).unwrap(), Some(snapshot));

        let other_day = date().succ_opt().unwrap();
        assert!(db.digest(other_day).unwrap().is_none());
    }

    #[test]
    fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobtrack.db");
        {
            let db = Database::open(&path).unwrap();
            db.init().unwrap();
            db.set_preferences(&sample_prefs()).unwrap();
            db.save_job(9).unwrap();
        }
        let db = Database::open(&path).unwrap();
        db.ensure_initialized().unwrap();
        assert_eq!(db.preferences().unwrap(), Some(sample_prefs()));
        assert_eq!(db.saved_job_ids().unwrap(), vec![9]);
        assert_eq!(db.path(), &path);
    }
}
