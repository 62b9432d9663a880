use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StoreError;
use crate::models::{ApplicationRecord, ApplicationStatus, ApplicationUpdate, JobPosting};

// --- Store trait ---

/// The two operations the batch core needs from persistent storage.
pub trait ApplicationStore {
    /// Postings whose application record is `unapplied`, joined on job id.
    fn unapplied_postings(&self) -> Result<Vec<JobPosting>, StoreError>;

    /// Apply one targeted update to the record for `update.job_id`.
    fn apply_update(&self, update: &ApplicationUpdate) -> Result<(), StoreError>;
}

/// SQLite store. Holds only the path; every operation opens its own
/// connection so nothing stays locked across the pauses between jobs.
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "batch-apply") {
            proj_dirs.data_dir().join("jobs.db")
        } else {
            PathBuf::from("jobs.db")
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    pub fn init(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT,
                url TEXT NOT NULL,
                platform TEXT,
                match_score REAL,
                saved_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS applications (
                job_id TEXT NOT NULL UNIQUE REFERENCES jobs(id),
                status TEXT NOT NULL DEFAULT 'unapplied'
                    CHECK (status IN ('unapplied', 'applied', 'failed', 'skipped')),
                notes TEXT,
                platform TEXT,
                applied_at INTEGER,
                screenshot_path TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            "#,
        )?;
        Ok(())
    }

    /// Fails fast when the store is unreachable or has no schema, so a run
    /// aborts before touching any job.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotInitialized(self.path.clone()));
        }
        let conn = self.connect()?;
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table' AND name IN ('jobs', 'applications')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(StoreError::NotInitialized(self.path.clone()));
        }
        Ok(())
    }

    pub fn get_application(&self, job_id: &str) -> Result<Option<ApplicationRecord>, StoreError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT job_id, status, notes, platform, applied_at, screenshot_path, updated_at
                 FROM applications WHERE job_id = ?1",
                [job_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((job_id, status, notes, platform, applied_at, screenshot_path, updated_at)) = row
        else {
            return Ok(None);
        };

        let status = status.parse::<ApplicationStatus>().map_err(StoreError::InvalidRow)?;
        let applied_at = match applied_at {
            Some(secs) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                StoreError::InvalidRow(format!("applied_at out of range: {}", secs))
            })?),
            None => None,
        };

        Ok(Some(ApplicationRecord {
            job_id,
            status,
            notes,
            platform,
            applied_at,
            screenshot_path,
            updated_at,
        }))
    }

    fn row_to_posting(row: &rusqlite::Row) -> rusqlite::Result<JobPosting> {
        Ok(JobPosting {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            url: row.get(4)?,
            platform: row.get(5)?,
            match_score: row.get(6)?,
        })
    }

    /// Ingest a posting with its paired `unapplied` record. Ingestion is not
    /// part of the batch core; tests use this to seed stores.
    #[cfg(test)]
    pub fn insert_posting(&self, job: &JobPosting) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO jobs (id, title, company, location, url, platform, match_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id,
                job.title,
                job.company,
                job.location,
                job.url,
                job.platform,
                job.match_score
            ],
        )?;
        tx.execute("INSERT INTO applications (job_id) VALUES (?1)", [&job.id])?;
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn set_status(&self, job_id: &str, status: ApplicationStatus) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE applications SET status = ?1 WHERE job_id = ?2",
            params![status.as_str(), job_id],
        )?;
        Ok(())
    }
}

impl ApplicationStore for Database {
    fn unapplied_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT j.id, j.title, j.company, j.location, j.url, j.platform, j.match_score
             FROM jobs j
             INNER JOIN applications a ON j.id = a.job_id
             WHERE a.status = 'unapplied'
             ORDER BY j.match_score IS NULL, j.match_score DESC, j.id ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_posting)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn apply_update(&self, update: &ApplicationUpdate) -> Result<(), StoreError> {
        let conn = self.connect()?;
        // applied_at: keep an existing timestamp when re-recording an applied
        // job, otherwise take the supplied value (NULL clears it).
        let changed = conn.execute(
            "UPDATE applications
             SET status = ?1,
                 notes = ?2,
                 platform = COALESCE(?3, platform),
                 applied_at = CASE
                     WHEN ?4 IS NOT NULL AND status = 'applied' AND applied_at IS NOT NULL
                         THEN applied_at
                     ELSE ?4
                 END,
                 screenshot_path = COALESCE(?5, screenshot_path),
                 updated_at = datetime('now')
             WHERE job_id = ?6",
            params![
                update.status.as_str(),
                update.notes,
                update.platform,
                update.applied_at,
                update.screenshot_path,
                update.job_id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingRecord(update.job_id.clone()));
        }
        Ok(())
    }
}
