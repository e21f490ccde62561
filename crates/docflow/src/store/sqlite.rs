//! `JobStore` backed by the SQLite [`Database`].

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::db::job_repo::{self, JobRow};
use crate::db::sub_job_repo::{self, SubJobRow};
use crate::db::Database;
use crate::error::StoreError;
use crate::model::{Job, JobParams, JobStatus, NewJob, NewSubJob, SubJob};

use super::JobStore;

#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// In-memory store with all migrations applied.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Fixed-width RFC 3339 so lexical order in SQL matches chronological order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", value, e),
        })
}

fn corrupt(id: &str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn job_from_row(row: JobRow) -> Result<Job, StoreError> {
    let job_type = row.job_type.parse().map_err(|e| corrupt(&row.id, e))?;
    let status = row.status.parse().map_err(|e| corrupt(&row.id, e))?;
    let params: JobParams = serde_json::from_str(&row.params).map_err(|e| corrupt(&row.id, e))?;
    let created_at = parse_timestamp(&row.id, &row.created_at)?;
    let updated_at = parse_timestamp(&row.id, &row.updated_at)?;

    Ok(Job {
        id: row.id,
        original_filename: row.original_filename,
        job_type,
        status,
        error: row.error,
        params,
        submitted_by: row.submitted_by,
        created_at,
        updated_at,
    })
}

fn sub_job_from_row(row: SubJobRow) -> Result<SubJob, StoreError> {
    let operation = row.operation.parse().map_err(|e| corrupt(&row.id, e))?;
    let file_size = u64::try_from(row.file_size).map_err(|e| corrupt(&row.id, e))?;
    let created_at = parse_timestamp(&row.id, &row.created_at)?;
    let updated_at = parse_timestamp(&row.id, &row.updated_at)?;

    Ok(SubJob {
        id: row.id,
        job_id: row.job_id,
        original_name: row.original_name,
        file_size,
        operation,
        source_path: row.source_path,
        output_path: row.output_path,
        created_at,
        updated_at,
    })
}

impl JobStore for SqliteJobStore {
    fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let now = Utc::now();
        let params = serde_json::to_string(&job.params).map_err(|e| corrupt("new job", e))?;
        let row = JobRow {
            id: Uuid::new_v4().to_string(),
            original_filename: job.original_filename,
            job_type: job.job_type.as_str().to_string(),
            status: JobStatus::Pending.as_str().to_string(),
            error: None,
            params,
            submitted_by: job.submitted_by,
            created_at: timestamp(now),
            updated_at: timestamp(now),
        };

        self.db.with_conn(|conn| job_repo::insert(conn, &row))?;
        log::debug!("Created job {} ({})", row.id, row.job_type);

        Ok(Job {
            id: row.id,
            original_filename: row.original_filename,
            job_type: job.job_type,
            status: JobStatus::Pending,
            error: None,
            params: job.params,
            submitted_by: row.submitted_by,
            created_at: now,
            updated_at: now,
        })
    }

    fn find_job(&self, id: &str) -> Result<Job, StoreError> {
        let row = self
            .db
            .with_conn(|conn| job_repo::find_by_id(conn, id))?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        job_from_row(row)
    }

    fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<Job, StoreError> {
        self.db.with_transaction(|tx| {
            let current = job_repo::find_by_id(tx, id)?
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            let current = job_from_row(current)?;

            if !current.status.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    from: current.status,
                    to: status,
                });
            }
            if current.status == status {
                return Ok(current);
            }

            if !job_repo::update_status(tx, id, status.as_str(), error, &timestamp(Utc::now()))? {
                return Err(StoreError::NotFound { id: id.to_string() });
            }

            let updated = job_repo::find_by_id(tx, id)?
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            job_from_row(updated)
        })
    }

    fn create_sub_job(&self, sub_job: NewSubJob) -> Result<SubJob, StoreError> {
        let now = Utc::now();
        let file_size = i64::try_from(sub_job.file_size).map_err(|e| corrupt(&sub_job.job_id, e))?;
        let row = SubJobRow {
            id: Uuid::new_v4().to_string(),
            job_id: sub_job.job_id,
            original_name: sub_job.original_name,
            file_size,
            operation: sub_job.operation.as_str().to_string(),
            source_path: sub_job.source_path,
            output_path: None,
            created_at: timestamp(now),
            updated_at: timestamp(now),
        };

        self.db.with_conn(|conn| sub_job_repo::insert(conn, &row))?;

        Ok(SubJob {
            id: row.id,
            job_id: row.job_id,
            original_name: row.original_name,
            file_size: sub_job.file_size,
            operation: sub_job.operation,
            source_path: row.source_path,
            output_path: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn sub_jobs_for(&self, job_id: &str) -> Result<Vec<SubJob>, StoreError> {
        self.db
            .with_conn(|conn| sub_job_repo::find_by_job(conn, job_id))?
            .into_iter()
            .map(sub_job_from_row)
            .collect()
    }

    fn set_output_path(&self, sub_job_id: &str, output_path: &str) -> Result<(), StoreError> {
        let changed = self.db.with_conn(|conn| {
            sub_job_repo::set_output_path(conn, sub_job_id, output_path, &timestamp(Utc::now()))
        })?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                id: sub_job_id.to_string(),
            });
        }
        Ok(())
    }

    fn list_sub_jobs(&self, limit: u64) -> Result<Vec<SubJob>, StoreError> {
        self.db
            .with_conn(|conn| sub_job_repo::list_recent(conn, limit))?
            .into_iter()
            .map(sub_job_from_row)
            .collect()
    }

    fn list_jobs(&self, status: Option<JobStatus>, limit: u64) -> Result<Vec<Job>, StoreError> {
        self.db
            .with_conn(|conn| job_repo::list(conn, status.map(|s| s.as_str()), limit))?
            .into_iter()
            .map(job_from_row)
            .collect()
    }
}
