//! Sub-job repository: artifact rows in the `sub_jobs` table.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw sub-job row from the database.
#[derive(Debug, Clone)]
pub struct SubJobRow {
    pub id: String,
    pub job_id: String,
    pub original_name: String,
    pub file_size: i64,
    pub operation: String,
    pub source_path: String,
    pub output_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SubJobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            original_name: row.get("original_name")?,
            file_size: row.get("file_size")?,
            operation: row.get("operation")?,
            source_path: row.get("source_path")?,
            output_path: row.get("output_path")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(conn: &Connection, row: &SubJobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sub_jobs (id, job_id, original_name, file_size, operation, source_path,
         output_path, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            row.id,
            row.job_id,
            row.original_name,
            row.file_size,
            row.operation,
            row.source_path,
            row.output_path,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

/// All sub-jobs of a job, in insertion order (upload index order).
pub fn find_by_job(conn: &Connection, job_id: &str) -> Result<Vec<SubJobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM sub_jobs WHERE job_id = ?1 ORDER BY rowid ASC")?;
    let rows = stmt
        .query_map(params![job_id], SubJobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Records the output location. Returns the number of rows touched.
pub fn set_output_path(
    conn: &Connection,
    id: &str,
    output_path: &str,
    updated_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE sub_jobs SET output_path = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, output_path, updated_at],
    )?;
    Ok(changed)
}

/// Most recent sub-jobs first.
pub fn list_recent(conn: &Connection, limit: u64) -> Result<Vec<SubJobRow>, DatabaseError> {
    let mut stmt = conn
        .prepare("SELECT * FROM sub_jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1")?;
    let rows = stmt
        .query_map(params![super::job_repo::sql_limit(limit)], SubJobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
