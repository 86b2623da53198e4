//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts over the cuaderno schema.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Repository writes enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `ParentNotFound`)
//!   in addition to DB transport errors.
//! - List orderings are deterministic: declared sort key, then insertion
//!   order (`seq`).

use crate::db::DbError;
use crate::model::{EntityKind, ModelValidationError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod note_repo;
pub mod notebook_repo;
pub mod photo_repo;

/// Claims the next store-wide insertion sequence number.
///
/// Callers must already hold a write transaction; the two statements are
/// atomic only inside one.
pub(crate) fn next_row_seq(conn: &Connection) -> RepoResult<i64> {
    conn.execute(
        "UPDATE store_meta SET value = value + 1 WHERE key = 'row_seq';",
        [],
    )?;
    let seq = conn.query_row(
        "SELECT value FROM store_meta WHERE key = 'row_seq';",
        [],
        |row| row.get(0),
    )?;
    Ok(seq)
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    NotFound { kind: EntityKind, id: Uuid },
    ParentNotFound { kind: EntityKind, id: Uuid },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::ParentNotFound { kind, id } => write!(f, "parent {kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::ParentNotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
