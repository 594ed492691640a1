//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
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

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied ledger schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Deposits: one row per custody commitment, never deleted once terminal
        CREATE TABLE deposits (
            deposit_id BLOB PRIMARY KEY,      -- 16 bytes
            creator BLOB NOT NULL,            -- 32 bytes
            depositor BLOB,                   -- 32 bytes, NULL until funded
            arbiter BLOB NOT NULL,            -- 32 bytes
            value BLOB NOT NULL,              -- u128, 16 bytes big-endian
            expiration INTEGER NOT NULL,      -- unlock time (seconds)
            state INTEGER NOT NULL,           -- 0=unlocked, 1=locked, 2=withdrawn, 3=slashed
            created_at INTEGER NOT NULL
        );

        -- Allocator counters: sequential counter and per-creator nonces
        CREATE TABLE counters (
            counter_key BLOB PRIMARY KEY,
            value BLOB NOT NULL               -- u128, 16 bytes big-endian
        );

        -- Event journal; a reverted batch gives its positions back
        CREATE TABLE journal (
            seq INTEGER PRIMARY KEY,
            deposit_id BLOB NOT NULL,
            kind TEXT NOT NULL,
            event BLOB NOT NULL,              -- CBOR-encoded LedgerEvent
            recorded_at INTEGER NOT NULL
        );

        CREATE INDEX idx_deposits_state ON deposits(state);
        CREATE INDEX idx_journal_deposit ON journal(deposit_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
