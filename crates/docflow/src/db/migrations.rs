//! Forward-only schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`. Each pending step
//! runs in its own transaction together with its bookkeeping row, so a
//! crash mid-upgrade never leaves a half-applied step behind.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// Set for `ALTER TABLE .. ADD COLUMN` steps, which SQLite cannot make
    /// idempotent on its own. Holds `(table, column)`.
    adds_column: Option<(&'static str, &'static str)>,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "create_jobs",
        sql: include_str!("sql/001_create_jobs.sql"),
        adds_column: None,
    },
    Step {
        version: 2,
        name: "create_sub_jobs",
        sql: include_str!("sql/002_create_sub_jobs.sql"),
        adds_column: None,
    },
    Step {
        version: 3,
        name: "add_submitted_by",
        sql: include_str!("sql/003_add_submitted_by.sql"),
        adds_column: Some(("jobs", "submitted_by")),
    },
];

pub fn run_all(conn: &mut Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY NOT NULL,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |r| r.get(0),
    )?;

    for step in STEPS.iter().filter(|s| s.version > applied) {
        apply(conn, step).map_err(|source| DatabaseError::Migration {
            version: step.version,
            name: step.name,
            source,
        })?;
    }
    Ok(())
}

fn apply(conn: &mut Connection, step: &Step) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;

    let already_there = match step.adds_column {
        Some((table, column)) => has_column(&tx, table, column)?,
        None => false,
    };
    if already_there {
        log::info!("Schema step {} ({}) already present", step.version, step.name);
    } else {
        log::info!("Applying schema step {} ({})", step.version, step.name);
        tx.execute_batch(step.sql)?;
    }

    tx.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
        params![step.version, step.name],
    )?;
    tx.commit()
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |r| r.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}
