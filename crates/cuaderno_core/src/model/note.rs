//! Note domain model.
//!
//! # Responsibility
//! - Define the titled text record owned by a notebook.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another note.
//! - `notebook` is assigned at creation and never changes.
//! - `created_at` never mutates; edits bump `updated_at` only.

use crate::model::notebook::NotebookId;
use crate::model::{EntityKind, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a note.
pub type NoteId = Uuid;

/// A titled text entry belonging to exactly one notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable global ID used for linking and auditing.
    pub uuid: NoteId,
    /// Owning notebook; immutable for the lifetime of the note.
    pub notebook: NotebookId,
    /// Display title; searchable.
    pub title: String,
    /// Free-form body text.
    pub contents: String,
    /// Unix epoch milliseconds; assigned at creation.
    pub created_at: i64,
    /// Unix epoch milliseconds; bumped by every edit.
    pub updated_at: i64,
}

impl Note {
    /// Creates a new note with a generated stable ID.
    ///
    /// `updated_at` starts equal to `created_at`.
    pub fn new(
        notebook: NotebookId,
        title: impl Into<String>,
        contents: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), notebook, title, contents, created_at)
    }

    /// Creates a new note with a caller-provided stable ID.
    pub fn with_id(
        uuid: NoteId,
        notebook: NotebookId,
        title: impl Into<String>,
        contents: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            uuid,
            notebook,
            title: title.into(),
            contents: contents.into(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Checks identity and ownership invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.uuid.is_nil() {
            return Err(ModelValidationError::NilUuid(EntityKind::Note));
        }
        if self.notebook.is_nil() {
            return Err(ModelValidationError::NilOwner(EntityKind::Note));
        }
        Ok(())
    }
}
