//! Photograph domain model.
//!
//! # Responsibility
//! - Define the binary image record attached to a notebook cover or a note.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another photograph.
//! - Exactly one of `notebook` / `note` is set; the CHECK constraint in
//!   storage mirrors this.

use crate::model::note::NoteId;
use crate::model::notebook::NotebookId;
use crate::model::{EntityKind, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a photograph.
pub type PhotographId = Uuid;

/// The parent a photograph is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotographOwner {
    /// Cover image of a notebook.
    NotebookCover(NotebookId),
    /// Image embedded in a note.
    Note(NoteId),
}

/// A binary image blob owned by a notebook cover or a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photograph {
    /// Stable global ID used for linking and auditing.
    pub uuid: PhotographId,
    /// Encoded image bytes as handed in by the caller.
    pub image_data: Vec<u8>,
    /// Unix epoch milliseconds; assigned at creation.
    pub created_at: i64,
    /// Set when this photograph is a notebook cover.
    pub notebook: Option<NotebookId>,
    /// Set when this photograph belongs to a note.
    pub note: Option<NoteId>,
}

impl Photograph {
    /// Creates a new photograph with a generated stable ID.
    pub fn new(owner: PhotographOwner, image_data: Vec<u8>, created_at: i64) -> Self {
        Self::with_id(Uuid::new_v4(), owner, image_data, created_at)
    }

    /// Creates a new photograph with a caller-provided stable ID.
    pub fn with_id(
        uuid: PhotographId,
        owner: PhotographOwner,
        image_data: Vec<u8>,
        created_at: i64,
    ) -> Self {
        let (notebook, note) = match owner {
            PhotographOwner::NotebookCover(id) => (Some(id), None),
            PhotographOwner::Note(id) => (None, Some(id)),
        };
        Self {
            uuid,
            image_data,
            created_at,
            notebook,
            note,
        }
    }

    /// Returns the owner reference, or `None` for an invalid persisted shape.
    pub fn owner(&self) -> Option<PhotographOwner> {
        match (self.notebook, self.note) {
            (Some(notebook), None) => Some(PhotographOwner::NotebookCover(notebook)),
            (None, Some(note)) => Some(PhotographOwner::Note(note)),
            _ => None,
        }
    }

    /// Checks identity and single-owner invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.uuid.is_nil() {
            return Err(ModelValidationError::NilUuid(EntityKind::Photograph));
        }
        match (self.notebook, self.note) {
            (Some(_), Some(_)) => Err(ModelValidationError::PhotographWithBothOwners),
            (None, None) => Err(ModelValidationError::PhotographWithoutOwner),
            (Some(id), None) | (None, Some(id)) if id.is_nil() => {
                Err(ModelValidationError::NilOwner(EntityKind::Photograph))
            }
            _ => Ok(()),
        }
    }
}
