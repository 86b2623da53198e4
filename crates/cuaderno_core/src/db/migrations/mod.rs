//! Versioned schema migrations.
//!
//! The registry pairs each schema version with the SQL that produces it;
//! `PRAGMA user_version` records how far a database has come. Opening a
//! database replays every step it is missing.
//!
//! # Invariants
//! - Registry entries are sorted by version and never reordered or edited
//!   once released; schema changes append a new step.
//! - Each step applies atomically, together with its version stamp.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Highest schema version this build can produce and read.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` to the latest schema version.
///
/// Databases already at the latest version pass through untouched; a
/// database ahead of this build is rejected.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::UnsupportedSchemaVersion { found, supported });
    }

    for (version, sql) in MIGRATIONS {
        if *version <= found {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
        tx.commit()?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
