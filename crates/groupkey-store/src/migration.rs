//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that takes the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: groups and their members.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per group namespace
        CREATE TABLE groups (
            prefix TEXT PRIMARY KEY,          -- group prefix URI
            epoch INTEGER NOT NULL,           -- current key epoch
            sealed_key BLOB NOT NULL,         -- encrypted blob, sealed to the manager
            updated_at INTEGER NOT NULL
        );

        -- Enrolled members
        CREATE TABLE members (
            prefix TEXT NOT NULL REFERENCES groups(prefix) ON DELETE CASCADE,
            member TEXT NOT NULL,             -- member identity URI
            certificate BLOB NOT NULL,        -- CBOR member certificate
            enrolled_at INTEGER NOT NULL,
            PRIMARY KEY (prefix, member)
        );

        CREATE INDEX idx_members_enrolled ON members(prefix, enrolled_at);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
