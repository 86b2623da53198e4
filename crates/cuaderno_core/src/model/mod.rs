//! Domain model for the cuaderno store.
//!
//! # Responsibility
//! - Define the canonical records persisted by the store: notebooks, notes
//!   and photographs.
//! - Keep identity and ownership invariants in one place.
//!
//! # Invariants
//! - Every record is identified by a stable, non-nil UUID.
//! - A note belongs to exactly one notebook for its whole lifetime.
//! - A photograph is owned by exactly one parent (notebook cover or note).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod note;
pub mod notebook;
pub mod photograph;

/// Entity categories stored by the cuaderno store.
///
/// Used to address watch queries and to qualify lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Notebook,
    Note,
    Photograph,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Notebook => "notebook",
            Self::Note => "note",
            Self::Photograph => "photograph",
        };
        f.write_str(label)
    }
}

/// Validation failure for an in-memory record.
///
/// Write paths validate before any SQL mutation, so invalid shapes never
/// reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValidationError {
    /// The record id is the nil UUID.
    NilUuid(EntityKind),
    /// A required owner reference is the nil UUID.
    NilOwner(EntityKind),
    /// A photograph carries no owner reference at all.
    PhotographWithoutOwner,
    /// A photograph claims both a notebook and a note owner.
    PhotographWithBothOwners,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid(kind) => write!(f, "{kind} uuid must not be nil"),
            Self::NilOwner(kind) => write!(f, "{kind} owner reference must not be nil"),
            Self::PhotographWithoutOwner => {
                write!(f, "photograph must reference a notebook or a note")
            }
            Self::PhotographWithBothOwners => {
                write!(f, "photograph must not reference both a notebook and a note")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// Current wall-clock time as unix epoch milliseconds.
///
/// Clock readings before the epoch collapse to zero rather than panicking.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
