//! SQLite plumbing: connection bootstrap and schema migrations.
//!
//! # Responsibility
//! - Hand out connections that are configured and fully migrated.
//! - Keep the schema version in `PRAGMA user_version`, one migration step
//!   per version.
//!
//! # Invariants
//! - No caller sees a connection whose migrations did not complete.
//! - Databases written by a newer build are rejected, never repaired.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure opening or migrating the backing database.
#[derive(Debug)]
pub enum DbError {
    /// Transport or constraint error straight from SQLite.
    Sqlite(rusqlite::Error),
    /// The file on disk was written by a newer build of this crate.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "schema version {found} is ahead of this build (supports up to {supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
