//! Job repository: raw row access for the `jobs` table.
//!
//! Statuses, job types and params stay as the strings stored in SQLite.
//! Parsing them into model types is the store's job.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

const COLUMNS: &str = "id, original_filename, job_type, status, error, params, submitted_by, \
                       created_at, updated_at";

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub original_filename: String,
    pub job_type: String,
    pub status: String,
    pub error: Option<String>,
    /// `JobParams` as JSON.
    pub params: String,
    pub submitted_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for JobRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            original_filename: row.get(1)?,
            job_type: row.get(2)?,
            status: row.get(3)?,
            error: row.get(4)?,
            params: row.get(5)?,
            submitted_by: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

pub fn insert(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO jobs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            job.id,
            job.original_filename,
            job.job_type,
            job.status,
            job.error,
            job.params,
            job.submitted_by,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM jobs WHERE id = ?1"),
            params![id],
            |row| JobRow::try_from(row),
        )
        .optional()?;
    Ok(row)
}

/// Overwrites status and error together; a `None` error clears the column.
/// Returns `false` when no row has this id.
pub fn update_status(
    conn: &Connection,
    id: &str,
    status: &str,
    error: Option<&str>,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, status, error, updated_at],
    )?;
    Ok(changed > 0)
}

/// Newest first. `status` of `None` lists every job.
pub fn list(
    conn: &Connection,
    status: Option<&str>,
    limit: u64,
) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM jobs
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![status, sql_limit(limit)], |row| JobRow::try_from(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// SQLite limits are signed; anything past `i64::MAX` means "no limit".
pub(crate) fn sql_limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
