//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the store traits.

use crate::model::{
    CrawlJob, DataSource, JobStatus, JobUpdate, NewSubmission, SourceKind, SubmissionRecord,
    SubmissionType,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    JobStore, SourceCatalog, StorageError, StorageResult, SubmissionStore,
};
use crate::storage::{format_timestamp, parse_timestamp, JobStatusCount, UpsertOutcome};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const DEADLINE_FORMAT: &str = "%Y-%m-%d";

const JOB_COLUMNS: &str = "id, source_name, status, items_found, items_added, error_message,
     created_at, started_at, completed_at";

const SUBMISSION_COLUMNS: &str = "id, title, description, type, organizer, deadline, location,
     website, email, phone, fee, prize, requirements, tags, is_active, created_at, updated_at";

const SOURCE_COLUMNS: &str =
    "id, name, url, kind, crawler_name, frequency_hours, active, last_crawled_at, config";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts a `pending` job with an explicit creation time
    pub fn create_job_at(
        &mut self,
        source_label: &str,
        created_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_jobs (source_name, status, created_at) VALUES (?1, ?2, ?3)",
            params![
                source_label,
                JobStatus::Pending.to_db_string(),
                format_timestamp(created_at)
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Applies a job update as of `now`
    pub fn update_job_at(
        &mut self,
        job_id: i64,
        update: &JobUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        if update.items_added > update.items_found {
            return Err(StorageError::ConstraintViolation(format!(
                "job {}: items_added ({}) exceeds items_found ({})",
                job_id, update.items_added, update.items_found
            )));
        }

        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        let current = current.ok_or(StorageError::JobNotFound(job_id))?;
        let current = JobStatus::from_db_string(&current).ok_or_else(|| {
            StorageError::Database(format!("job {} has unknown status '{}'", job_id, current))
        })?;

        if !current.can_transition_to(update.status) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: update.status,
            });
        }

        let now = format_timestamp(now);
        let started_at = (update.status != JobStatus::Pending).then(|| now.clone());
        let completed_at = update.status.is_terminal().then_some(now);

        // COALESCE keeps the first stamp so re-applying an update changes nothing
        self.conn.execute(
            "UPDATE crawl_jobs SET
                status = ?1,
                items_found = ?2,
                items_added = ?3,
                error_message = ?4,
                started_at = COALESCE(started_at, ?5),
                completed_at = CASE WHEN ?6 IS NULL THEN NULL ELSE COALESCE(completed_at, ?6) END
             WHERE id = ?7",
            params![
                update.status.to_db_string(),
                update.items_found as i64,
                update.items_added as i64,
                update.error_message,
                started_at,
                completed_at,
                job_id
            ],
        )?;

        Ok(())
    }

    /// Deletes jobs created strictly before `now - days`
    ///
    /// A window reaching past the earliest representable time purges nothing.
    pub fn purge_older_than_at(&mut self, days: u32, now: DateTime<Utc>) -> StorageResult<usize> {
        let Some(cutoff) = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
        else {
            tracing::warn!(
                "Retention window of {} days reaches before any job; nothing purged",
                days
            );
            return Ok(0);
        };
        let removed = self.conn.execute(
            "DELETE FROM crawl_jobs WHERE created_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(removed)
    }

    /// Counts all job rows
    pub fn count_jobs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crawl_jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl JobStore for SqliteStorage {
    fn create_job(&mut self, source_label: &str) -> StorageResult<i64> {
        self.create_job_at(source_label, Utc::now())
    }

    fn update_job(&mut self, job_id: i64, update: &JobUpdate) -> StorageResult<()> {
        self.update_job_at(job_id, update, Utc::now())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<CrawlJob> {
        let sql = format!("SELECT {} FROM crawl_jobs WHERE id = ?1", JOB_COLUMNS);
        self.conn
            .query_row(&sql, params![job_id], job_from_row)
            .optional()?
            .ok_or(StorageError::JobNotFound(job_id))
    }

    fn purge_older_than(&mut self, days: u32) -> StorageResult<usize> {
        self.purge_older_than_at(days, Utc::now())
    }

    fn job_stats_for_day(&self, day: NaiveDate) -> StorageResult<Vec<JobStatusCount>> {
        let start = day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).ok_or_else(|| {
            StorageError::Database(format!("cannot compute start of day {}", day))
        })?;
        let end = start + Duration::days(1);

        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(items_found), 0), COALESCE(SUM(items_added), 0)
             FROM crawl_jobs
             WHERE created_at >= ?1 AND created_at < ?2
             GROUP BY status
             ORDER BY status",
        )?;

        let rows = stmt.query_map(
            params![format_timestamp(start), format_timestamp(end)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;

        let mut counts = Vec::new();
        for row in rows {
            let (status, jobs, found, added) = row?;
            match JobStatus::from_db_string(&status) {
                Some(status) => counts.push(JobStatusCount {
                    status,
                    jobs: jobs as u64,
                    items_found: found as u64,
                    items_added: added as u64,
                }),
                None => tracing::warn!("Skipping jobs with unknown status '{}'", status),
            }
        }

        counts.sort_by_key(|c| c.status);
        Ok(counts)
    }
}

impl SubmissionStore for SqliteStorage {
    fn upsert_submission(
        &mut self,
        submission: &NewSubmission,
        now: DateTime<Utc>,
    ) -> StorageResult<UpsertOutcome> {
        let now = format_timestamp(now);
        let deadline = submission.deadline.format(DEADLINE_FORMAT).to_string();

        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM submissions WHERE title = ?1 AND organizer = ?2",
                params![submission.title, submission.organizer],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE submissions SET description = ?1, deadline = ?2, updated_at = ?3
                     WHERE id = ?4",
                    params![submission.description, deadline, now, id],
                )?;
                UpsertOutcome::Updated(id)
            }
            None => {
                let requirements = serde_json::to_string(&submission.requirements)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                let tags = serde_json::to_string(&submission.tags)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;

                tx.execute(
                    "INSERT INTO submissions (title, description, type, organizer, deadline,
                     location, website, email, phone, fee, prize, requirements, tags,
                     is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1, ?14, ?14)",
                    params![
                        submission.title,
                        submission.description,
                        submission.submission_type.as_str(),
                        submission.organizer,
                        deadline,
                        submission.location,
                        submission.website,
                        submission.email,
                        submission.phone,
                        submission.fee,
                        submission.prize,
                        requirements,
                        tags,
                        now,
                    ],
                )?;
                UpsertOutcome::Created(tx.last_insert_rowid())
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_submission_by_key(
        &self,
        title: &str,
        organizer: &str,
    ) -> StorageResult<Option<SubmissionRecord>> {
        let sql = format!(
            "SELECT {} FROM submissions WHERE title = ?1 AND organizer = ?2",
            SUBMISSION_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![title, organizer], submission_from_row)
            .optional()?;
        Ok(record)
    }

    fn count_submissions(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl SourceCatalog for SqliteStorage {
    fn load_sources(&self) -> StorageResult<Vec<DataSource>> {
        let sql = format!("SELECT {} FROM data_sources ORDER BY id", SOURCE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let sources = stmt
            .query_map([], source_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn upsert_source(&mut self, source: &DataSource) -> StorageResult<()> {
        if source.frequency_hours == 0 {
            return Err(StorageError::ConstraintViolation(format!(
                "source '{}' must have a positive frequency",
                source.id
            )));
        }

        let config = serde_json::to_string(&source.config)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO data_sources
             (id, name, url, kind, crawler_name, frequency_hours, active, last_crawled_at, config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                kind = excluded.kind,
                crawler_name = excluded.crawler_name,
                frequency_hours = excluded.frequency_hours,
                active = excluded.active,
                config = excluded.config",
            params![
                source.id,
                source.name,
                source.url,
                source.kind.to_db_string(),
                source.crawler_name,
                source.frequency_hours,
                source.active,
                source.last_crawled_at.map(format_timestamp),
                config,
            ],
        )?;
        Ok(())
    }

    fn mark_source_crawled(&mut self, source_id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE data_sources SET last_crawled_at = ?1 WHERE id = ?2",
            params![format_timestamp(at), source_id],
        )?;

        if updated == 0 {
            return Err(StorageError::SourceNotFound(source_id.to_string()));
        }
        Ok(())
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_timestamp(&value).map_err(|e| conversion_error(idx, e))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| parse_timestamp(&v).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlJob> {
    let status: String = row.get(2)?;
    Ok(CrawlJob {
        id: row.get(0)?,
        source_name: row.get(1)?,
        status: JobStatus::from_db_string(&status).unwrap_or(JobStatus::Failed),
        items_found: row.get::<_, i64>(3)? as u64,
        items_added: row.get::<_, i64>(4)? as u64,
        error_message: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        started_at: optional_timestamp_column(row, 7)?,
        completed_at: optional_timestamp_column(row, 8)?,
    })
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<SubmissionRecord> {
    let submission_type: String = row.get(3)?;
    let deadline: String = row.get(5)?;
    let requirements: String = row.get(12)?;
    let tags: String = row.get(13)?;

    Ok(SubmissionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        submission_type: SubmissionType::parse(&submission_type).unwrap_or(SubmissionType::Other),
        organizer: row.get(4)?,
        deadline: NaiveDate::parse_from_str(&deadline, DEADLINE_FORMAT)
            .map_err(|e| conversion_error(5, e))?,
        location: row.get(6)?,
        website: row.get(7)?,
        email: row.get(8)?,
        phone: row.get(9)?,
        fee: row.get(10)?,
        prize: row.get(11)?,
        requirements: serde_json::from_str::<BTreeMap<String, String>>(&requirements)
            .unwrap_or_default(),
        tags: serde_json::from_str::<Vec<String>>(&tags).unwrap_or_default(),
        is_active: row.get(14)?,
        created_at: timestamp_column(row, 15)?,
        updated_at: timestamp_column(row, 16)?,
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<DataSource> {
    let kind: String = row.get(3)?;
    let config: String = row.get(8)?;

    Ok(DataSource {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        kind: SourceKind::from_db_string(&kind).unwrap_or(SourceKind::Website),
        crawler_name: row.get(4)?,
        frequency_hours: row.get(5)?,
        active: row.get(6)?,
        last_crawled_at: optional_timestamp_column(row, 7)?,
        config: serde_json::from_str(&config).unwrap_or(serde_json::Value::Null),
    })
}
